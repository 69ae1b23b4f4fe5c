use std::time::Duration;

use hotstrings::config::{ConfigFlags, OutputMode, load_config_flags, parse_flag_tokens};
use hotstrings::definitions::LoadOptions;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hotstringsrc");
    let content = r"
# comment
--watch

--context work
   
--delay=25
";
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.context.as_deref(), Some("work"));
    assert_eq!(flags.emit_delay(), Duration::from_millis(25));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hotstringsrc");
    let content = "--extensions\n--context home\n--output json\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "hotstrings".to_string(),
        "--context".to_string(),
        "work".to_string(),
        "--regex".to_string(),
        "defs.ahk".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert_eq!(
        effective.load_options(),
        LoadOptions {
            regex_triggers: true,
            extensions: true,
        },
        "file and cli switches should both apply"
    );
    assert_eq!(effective.context_name(), "work", "cli should override context");
    assert_eq!(
        effective.output,
        Some(OutputMode::Json),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}
