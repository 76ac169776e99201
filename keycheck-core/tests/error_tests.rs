use keycheck_core::KeyCheckError;

#[test]
fn error_display_input() {
    let err = KeyCheckError::Input("empty key".into());
    let msg = format!("{err}");
    assert!(msg.contains("invalid input"));
    assert!(msg.contains("empty key"));
}

#[test]
fn error_display_not_found() {
    let err = KeyCheckError::NotFound;
    assert!(format!("{err}").contains("not found"));
    assert!(err.is_not_found());
}

#[test]
fn error_display_decode() {
    let err = KeyCheckError::Decode("no terminator after offset 8".into());
    assert!(format!("{err}").contains("decode error"));
    assert!(!err.is_not_found());
}

#[test]
fn error_display_config_load() {
    let err = KeyCheckError::ConfigLoad("failed to read PkeyData.xml".into());
    assert!(format!("{err}").contains("config load"));
}

#[test]
fn error_display_transport() {
    let err = KeyCheckError::Transport("timeout".into());
    assert!(format!("{err}").contains("transport"));
    assert!(err.is_transport());
}

#[test]
fn error_display_status() {
    let err = KeyCheckError::Status(reqwest::StatusCode::BAD_GATEWAY);
    assert!(format!("{err}").contains("502"));
    assert!(err.is_transport());
}

#[test]
fn error_display_protocol() {
    let err = KeyCheckError::Protocol("no ResponseXml".into());
    assert!(format!("{err}").contains("protocol"));
    assert!(!err.is_transport());
}

#[test]
fn error_is_debug() {
    let err = KeyCheckError::NotFound;
    let _ = format!("{err:?}");
}
