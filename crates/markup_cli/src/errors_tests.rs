use super::*;
use std::io;

#[test]
fn test_config_error_display() {
    let error = Error::from(ConfigError::Parse("expected a value".to_string()));
    assert_eq!(
        error.to_string(),
        "Configuration error: Failed to parse configuration: expected a value"
    );
}

#[test]
fn test_context_format_error_names_the_file() {
    let error = Error::ContextFormat(PathBuf::from("data.yaml"));
    let message = error.to_string();
    assert!(message.contains("data.yaml"));
    assert!(message.contains(".json or .toml"));
}

#[test]
fn test_context_parse_error_display() {
    let error = Error::ContextParse {
        path: PathBuf::from("data.json"),
        reason: "trailing comma".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Failed to parse context file \"data.json\": trailing comma"
    );
}

#[test]
fn test_load_file_error_keeps_source() {
    let error = Error::LoadFile {
        path: PathBuf::from("page.tpl"),
        source: io::Error::new(io::ErrorKind::NotFound, "File not found"),
    };
    assert_eq!(error.to_string(), "Failed to load file \"page.tpl\".");

    let source = std::error::Error::source(&error).unwrap();
    assert_eq!(source.to_string(), "File not found");
}

#[test]
fn test_render_error_converts() {
    let error = Error::from(RenderError::TemplateTooLarge { size: 10, limit: 4 });
    assert!(matches!(error, Error::Render(_)));
    assert!(error.to_string().starts_with("Render failed: "));
}

#[test]
fn test_error_debug_format() {
    let error = Error::StdOutWriteFailed;
    let debug_output = format!("{:?}", error);
    assert!(debug_output.contains("StdOutWriteFailed"));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}
