use std::io::IsTerminal;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use serde::Serialize;

use crate::api::{Faq, SupportTicket};
use crate::catalog::Counselling;
use crate::records::{
    format_currency, AllotmentRecord, AuthenticatedUser, ChoiceList, ClosingRankRecord,
    CollegeRecord, FeeStipendBondRecord, SeatMatrixRecord,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "text" | "txt" | "table" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A row type that can be laid out as a text table.
pub trait Tabular {
    fn headers() -> &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl Tabular for AllotmentRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "Round", "Rank", "State", "Institute", "Course", "Quota", "Category", "Fee",
            "Stipend Y1", "Bond", "Penalty", "Beds",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.round.to_string(),
            self.state_rank.to_string(),
            self.state.clone(),
            self.institute.clone(),
            self.course.clone(),
            self.quota.clone(),
            self.category.clone(),
            self.fee.clone(),
            self.stipend_year_1.clone(),
            format!("{}y", self.bond_years),
            self.bond_penalty.clone(),
            self.beds.to_string(),
        ]
    }
}

impl Tabular for ClosingRankRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "Quota", "Category", "State", "Institute", "Course", "Fee", "Beds", "2023 R1-R5",
            "2024 R1-R5",
        ]
    }

    fn cells(&self) -> Vec<String> {
        let rounds = |ranks: [u32; 5]| {
            ranks
                .iter()
                .map(|r| if *r == 0 { "-".to_string() } else { r.to_string() })
                .join("/")
        };
        vec![
            self.quota.clone(),
            self.category.clone(),
            self.state.clone(),
            self.institute.clone(),
            self.course.clone(),
            self.fee.clone(),
            self.beds.to_string(),
            rounds(self.ranks_2023().0),
            rounds(self.ranks_2024().0),
        ]
    }
}

impl Tabular for SeatMatrixRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "State", "Institute", "Course", "Quota", "Total", "GEN", "OBC", "SC", "ST", "EWS",
            "PwD",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.state.clone(),
            self.institute.clone(),
            self.course.clone(),
            self.quota.clone(),
            self.total_seats.to_string(),
            self.general.to_string(),
            self.obc.to_string(),
            self.sc.to_string(),
            self.st.to_string(),
            self.ews.to_string(),
            self.pwd.to_string(),
        ]
    }
}

impl Tabular for FeeStipendBondRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "State", "Institute", "Course", "Quota", "Fee", "Stipend Y1", "Bond", "Penalty",
            "Beds",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.state.clone(),
            self.institute.clone(),
            self.course.clone(),
            self.quota.clone(),
            self.fee.clone(),
            self.stipend_year_1.clone(),
            format!("{}y", self.bond_years),
            self.bond_penalty.clone(),
            self.beds.to_string(),
        ]
    }
}

impl Tabular for CollegeRecord {
    fn headers() -> &'static [&'static str] {
        &[
            "NIRF", "College", "City", "State", "Score", "Tuition/yr", "MBBS", "Cutoff", "Est.",
            "Type",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.nirf_rank.to_string(),
            self.name.clone(),
            self.city.clone(),
            self.state.clone(),
            format!("{:.2}", self.nirf_score),
            format_currency(self.tuition_per_year),
            self.mbbs_seats.to_string(),
            self.cutoff.clone(),
            self.established.to_string(),
            self.college_type.clone(),
        ]
    }
}

impl Tabular for ChoiceList {
    fn headers() -> &'static [&'static str] {
        &["ID", "Name", "Counselling", "Colleges", "Priority"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.name.clone(),
            self.counselling_type.clone(),
            self.count.to_string(),
            self.priority.to_string(),
        ]
    }
}

impl Tabular for Counselling {
    fn headers() -> &'static [&'static str] {
        &["Counselling", "Level"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.label.to_string(), self.level.to_string()]
    }
}

impl Tabular for SupportTicket {
    fn headers() -> &'static [&'static str] {
        &["ID", "Subject", "Status"]
    }

    fn cells(&self) -> Vec<String> {
        vec![self.id.clone(), self.subject.clone(), self.status.clone()]
    }
}

impl<T: Tabular> Tabular for &T {
    fn headers() -> &'static [&'static str] {
        T::headers()
    }

    fn cells(&self) -> Vec<String> {
        (*self).cells()
    }
}

/// Pads every column to its widest cell. Headers are bold unless color is
/// disabled through `colored::control`.
pub fn render_table<T: Tabular>(rows: &[T]) -> String {
    let headers = T::headers();
    let cells: Vec<Vec<String>> = rows.iter().map(|r| r.cells()).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header_line = headers
        .iter()
        .zip(&widths)
        .map(|(h, w)| pad(h, *w))
        .join("  ");
    out.push_str(&format!("{}\n", header_line.trim_end().bold()));
    out.push_str(&widths.iter().map(|w| "-".repeat(*w)).join("  "));
    out.push('\n');
    for row in &cells {
        let line = row.iter().zip(&widths).map(|(c, w)| pad(c, *w)).join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    format!("{value}{}", " ".repeat(width.saturating_sub(len)))
}

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

pub fn render_user(user: &AuthenticatedUser) -> String {
    let mut lines = vec![
        format!(":: {:<10}: {}", "Name", user.name),
        format!(":: {:<10}: {}", "Email", user.email),
        format!(":: {:<10}: {}", "Phone", user.phone),
    ];
    for (label, value) in [
        ("NEET rank", &user.neet_rank),
        ("Category", &user.category),
        ("State", &user.state),
    ] {
        if let Some(v) = value {
            lines.push(format!(":: {label:<10}: {v}"));
        }
    }
    lines.join("\n") + "\n"
}

pub fn render_faqs(faqs: &[Faq]) -> String {
    faqs.iter()
        .map(|f| {
            let category = if f.category.is_empty() {
                String::new()
            } else {
                format!(" [{}]", f.category)
            };
            format!("{}{}\n  {}\n", f.question.bold(), category, f.answer)
        })
        .join("\n")
}

/// Spinner on stderr while a dataset loads. Hidden when stderr is not a
/// terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let pb = ProgressBar::with_draw_target(None, target);
    if let Ok(style) = ProgressStyle::with_template(":: {spinner} {msg} [{elapsed}]") {
        pb.set_style(style);
    }
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
