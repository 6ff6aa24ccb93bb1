// ============================
// tests/unit/password_tests.rs
// ============================
use guardian_backend::auth::{validate_password_strength, PasswordPolicy, PasswordRequirements};
use guardian_backend::config::PasswordSettings;

fn cheap_policy() -> PasswordPolicy {
    PasswordPolicy::from_settings(&PasswordSettings {
        scrypt_log_n: 4,
        ..PasswordSettings::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_password_hashing_and_verification() {
    let policy = cheap_policy();
    let hash = policy.hash("SecureP@ssw0rd").await.unwrap();

    assert_ne!(hash, "SecureP@ssw0rd");
    assert!(hash.starts_with("$scrypt$"));
    assert!(policy.verify(&hash, "SecureP@ssw0rd").await);
    assert!(!policy.verify(&hash, "SecureP@ssw0rD").await);
    assert!(!policy.verify("not-a-phc-string", "SecureP@ssw0rd").await);

    // Salted: the same input never hashes the same way twice.
    assert_ne!(policy.hash("SecureP@ssw0rd").await.unwrap(), hash);
}

#[test]
fn test_password_strength_validation() {
    let requirements = PasswordRequirements::default();

    assert!(validate_password_strength("SecureP@ssw0rd", &requirements));
    assert!(!validate_password_strength("Short1", &requirements));
    assert!(!validate_password_strength("securep@ssw0rd", &requirements));
    assert!(!validate_password_strength("SECUREP@SSW0RD", &requirements));
    assert!(!validate_password_strength("SecureP@ssword", &requirements));
    // Special characters are optional by default.
    assert!(validate_password_strength("SecurePassw0rd", &requirements));

    let strict = PasswordRequirements {
        require_special: true,
        ..PasswordRequirements::default()
    };
    assert!(!validate_password_strength("SecurePassw0rd", &strict));
    assert!(cheap_policy().is_strong("SecurePassw0rd"));
}
