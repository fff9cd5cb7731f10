use crate::catalog;
use crate::cli::args::{BrowseArgs, CliArgs, Command, DatasetKind, SignupArgs};
use crate::dataset::SortOrder;
use crate::output::OutputFormat;
use crate::records::{ExamLevel, Ownership};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.format.as_deref() {
        OutputFormat::parse(raw).ok_or_else(|| format!("invalid --format '{raw}', expected text or json"))?;
    }
    if args.timeout == Some(0) {
        return Err("invalid --timeout, expected positive integer".to_string());
    }
    match &args.command {
        Command::Browse(browse) => validate_browse(browse),
        Command::Quotas { level } => parse_level(level).map(|_| ()),
        Command::Login { email, .. } => validate_email(email),
        Command::Signup(signup) => validate_signup(signup),
        Command::Predict { input, .. } => serde_json::from_str::<serde_json::Value>(input)
            .map(|_| ())
            .map_err(|e| format!("invalid --input, expected JSON: {e}")),
        _ => Ok(()),
    }
}

pub fn parse_level(raw: &str) -> Result<ExamLevel, String> {
    ExamLevel::parse(raw).ok_or_else(|| format!("invalid level '{raw}', expected UG or PG"))
}

fn validate_browse(args: &BrowseArgs) -> Result<(), String> {
    if let Some(raw) = args.counselling.as_deref() {
        if raw.trim().is_empty() {
            return Err("invalid --counselling, expected a non-empty label".to_string());
        }
        catalog::find(raw).ok_or_else(|| {
            format!("unknown counselling '{raw}' (run `counsel counselling` to list them)")
        })?;
    }
    if let Some(raw) = args.level.as_deref() {
        parse_level(raw)?;
    }
    if let Some(raw) = args.sort.as_deref() {
        SortOrder::parse(raw).ok_or_else(|| format!("invalid --sort '{raw}', expected asc or desc"))?;
    }
    if let Some(raw) = args.ownership.as_deref() {
        if args.dataset != DatasetKind::Colleges {
            return Err("--type only applies to colleges".to_string());
        }
        Ownership::parse(raw)
            .ok_or_else(|| format!("invalid --type '{raw}', expected government or private"))?;
    }
    if args.page == 0 {
        return Err("invalid --page, pages start at 1".to_string());
    }
    Ok(())
}

fn validate_signup(args: &SignupArgs) -> Result<(), String> {
    validate_email(&args.email)?;
    if args.name.trim().is_empty() {
        return Err("invalid --name, expected a non-empty name".to_string());
    }
    if args.phone.trim().is_empty() {
        return Err("invalid --phone, expected a phone number".to_string());
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), String> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(format!("invalid email '{email}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(argv)
    }

    #[test]
    fn browse_defaults_are_valid() {
        assert!(validate(&parse(&["counsel", "browse", "allotments"])).is_ok());
    }

    #[test]
    fn unknown_counselling_is_rejected() {
        let args = parse(&["counsel", "browse", "allotments", "-c", "Atlantis - PG Medical"]);
        assert!(validate(&args).unwrap_err().contains("unknown counselling"));
    }

    #[test]
    fn ownership_only_for_colleges() {
        let args = parse(&["counsel", "browse", "allotments", "--type", "private"]);
        assert!(validate(&args).is_err());
        let args = parse(&["counsel", "browse", "colleges", "--type", "private"]);
        assert!(validate(&args).is_ok());
        let args = parse(&["counsel", "browse", "colleges", "--type", "trust"]);
        assert!(validate(&args).is_err());
    }

    #[test]
    fn page_zero_and_bad_sort_are_rejected() {
        assert!(validate(&parse(&["counsel", "browse", "fees", "--page", "0"])).is_err());
        assert!(validate(&parse(&["counsel", "browse", "fees", "--sort", "up"])).is_err());
    }

    #[test]
    fn format_is_global() {
        let args = parse(&["counsel", "counselling", "--format", "yaml"]);
        assert!(validate(&args).is_err());
        let args = parse(&["counsel", "counselling", "-o", "json"]);
        assert!(validate(&args).is_ok());
    }

    #[test]
    fn login_email_must_look_like_an_address() {
        assert!(validate(&parse(&["counsel", "login", "-e", "nobody"])).is_err());
        assert!(validate(&parse(&["counsel", "login", "-e", "a@b.in"])).is_ok());
    }

    #[test]
    fn predictor_input_must_be_json() {
        assert!(validate(&parse(&["counsel", "predict", "rank", "--input", "{"])).is_err());
        assert!(validate(&parse(&["counsel", "predict", "rank", "--input", r#"{"score":600}"#])).is_ok());
    }
}
