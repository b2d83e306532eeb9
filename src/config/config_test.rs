use std::{error::Error, fs, path::PathBuf};

use crate::{
    config::{path, AdvancedTranslatorConfig, ProfileConfig, TranslatorConfig},
    input::option::OptionValue,
};

const PROFILE: &str = r#"
version: 1
kind: Profile
name: Swap Dpad
description: Swaps up and down and combines them into a chord
mapping:
  - event: up
    translator:
      kind: identity
      target: down
  - event: stick_x
    translator:
      kind: scale
      factor: 0.5
advanced:
  - events: [up, down]
    translator:
      kind: chord
      target: both
options:
  rumble: false
  deadzone: 1200
"#;

#[test]
fn test_load_profile_yaml() -> Result<(), Box<dyn Error>> {
    let profile = ProfileConfig::from_yaml(PROFILE.to_string())?;
    assert_eq!(profile.name, "Swap Dpad");
    assert_eq!(profile.kind, "Profile");
    assert_eq!(profile.mapping.len(), 2);
    assert_eq!(
        profile.mapping[0].translator,
        TranslatorConfig::Identity {
            target: Some("down".to_string())
        }
    );
    assert_eq!(
        profile.mapping[1].translator,
        TranslatorConfig::Scale {
            target: None,
            factor: 0.5
        }
    );
    assert_eq!(profile.advanced[0].events, vec!["up", "down"]);
    assert_eq!(
        profile.advanced[0].translator,
        AdvancedTranslatorConfig::Chord {
            target: "both".to_string()
        }
    );
    assert_eq!(profile.options.get("rumble"), Some(&OptionValue::Bool(false)));
    assert_eq!(profile.options.get("deadzone"), Some(&OptionValue::Int(1200)));

    Ok(())
}

#[test]
fn test_unknown_translator_kind() {
    let content = r#"
version: 1
kind: Profile
name: Broken
mapping:
  - event: up
    translator:
      kind: teleport
"#;
    assert!(ProfileConfig::from_yaml(content.to_string()).is_err());
}

#[test]
fn test_find_profile() -> Result<(), Box<dyn Error>> {
    let base = std::env::temp_dir().join(format!("inputmapper-config-{}", std::process::id()));
    let overrides = base.join("profiles.d");
    let shipped = base.join("profiles");
    fs::create_dir_all(&overrides)?;
    fs::create_dir_all(&shipped)?;
    fs::write(shipped.join("default.yaml"), PROFILE)?;
    fs::write(overrides.join("default.yaml"), PROFILE)?;
    fs::write(shipped.join("notes.txt"), "not a profile")?;

    let dirs: Vec<PathBuf> = vec![overrides.clone(), shipped.clone()];
    let files = path::get_profile_files(&dirs);
    assert_eq!(files, vec![overrides.join("default.yaml")]);

    let found = path::find_profile_in(&dirs, "default");
    assert_eq!(found, Some(overrides.join("default.yaml")));
    assert_eq!(path::find_profile_in(&dirs, "notes"), None);

    let profile = ProfileConfig::from_yaml_file(overrides.join("default.yaml"))?;
    assert_eq!(profile.version, 1);

    fs::remove_dir_all(&base)?;
    Ok(())
}
