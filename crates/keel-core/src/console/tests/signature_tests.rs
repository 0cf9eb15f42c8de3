use crate::console::command::{Parameter, parse_signature};
use crate::console::error::ConsoleError;

#[test]
fn test_name_only() {
    let (name, parameters) = parse_signature("inspire").unwrap();
    assert_eq!(name, "inspire");
    assert!(parameters.is_empty());
}

#[test]
fn test_arguments_flags_and_options() {
    let (name, parameters) =
        parse_signature("mail:send {user : The user id} {queue?} {tries=3} {--force} {--delay=} {--via=smtp}")
            .unwrap();
    assert_eq!(name, "mail:send");
    assert_eq!(
        parameters,
        vec![
            Parameter::Argument {
                name: "user".into(),
                required: true,
                default: None,
                description: "The user id".into(),
            },
            Parameter::Argument {
                name: "queue".into(),
                required: false,
                default: None,
                description: String::new(),
            },
            Parameter::Argument {
                name: "tries".into(),
                required: false,
                default: Some("3".into()),
                description: String::new(),
            },
            Parameter::Flag {
                name: "force".into(),
                description: String::new(),
            },
            Parameter::Option {
                name: "delay".into(),
                default: None,
                description: String::new(),
            },
            Parameter::Option {
                name: "via".into(),
                default: Some("smtp".into()),
                description: String::new(),
            },
        ]
    );
}

#[test]
fn test_malformed_signatures_are_rejected() {
    for signature in ["", "{name}", "greet {name", "greet {}", "greet stray {name}", "greet {--}"] {
        match parse_signature(signature) {
            Err(ConsoleError::InvalidSignature { signature: s, .. }) => assert_eq!(s, signature),
            other => panic!("expected InvalidSignature for {:?}, got {:?}", signature, other),
        }
    }
}
