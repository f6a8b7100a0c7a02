use portal_backend_lib::auth::{validate_password_strength, CredentialHasher, PasswordRequirements};
use portal_backend_lib::config::HashingSettings;

fn cheap(log_n: u8) -> CredentialHasher {
    CredentialHasher::new(&HashingSettings { log_n, r: 8, p: 1 }).unwrap()
}

#[test]
fn test_password_hashing_and_verification() {
    let hasher = cheap(4);
    let password = "SecureP@ssw0rd";

    let hash = hasher.hash(password).unwrap();
    assert_ne!(password, hash);
    assert!(hash.starts_with("$scrypt$ln=4,r=8,p=1$"));

    assert!(hasher.verify(password, &hash));
    assert!(!hasher.verify("SecureP@ssw0rD", &hash));

    // Fresh salt every time
    assert_ne!(hash, hasher.hash(password).unwrap());
}

#[test]
fn test_malformed_digest_fails_closed() {
    let hasher = cheap(4);
    assert!(!hasher.verify("anything", ""));
    assert!(!hasher.verify("anything", "not-a-phc-string"));
    assert!(!hasher.verify("anything", "$argon2id$v=19$m=16,t=2,p=1$c2FsdHNhbHQ$aGFzaA"));
    assert!(!hasher.verify_absent("anything"));
}

#[test]
fn test_needs_rehash_tracks_configured_cost() {
    let old = cheap(4).hash("SecureP@ssw0rd").unwrap();
    let current = cheap(5);

    assert!(current.needs_rehash(&old));
    assert!(!current.needs_rehash(&current.hash("SecureP@ssw0rd").unwrap()));
    assert!(current.needs_rehash("$2b$12$legacybcryptdigest"));
}

#[test]
fn test_password_strength_validation() {
    let requirements = PasswordRequirements::default();

    // Valid password
    assert!(validate_password_strength("SecureP@ssw0rd", &requirements));

    // Too short
    assert!(!validate_password_strength("Sh0rt!", &requirements));

    // Missing uppercase
    assert!(!validate_password_strength("securep@ssw0rd", &requirements));

    // Missing lowercase
    assert!(!validate_password_strength("SECUREP@SSW0RD", &requirements));

    // Missing digit
    assert!(!validate_password_strength("SecureP@ssword", &requirements));

    // Missing special character
    assert!(!validate_password_strength("SecurePassw0rd", &requirements));

    // Symbol outside the accepted set
    assert!(!validate_password_strength("SecureP#ssw0rd", &requirements));

    // Custom requirements
    let custom_requirements = PasswordRequirements {
        min_length: 8,
        require_uppercase: false,
        require_lowercase: true,
        require_digit: true,
        require_special: false,
        restrict_charset: false,
    };

    assert!(validate_password_strength("securepassw0rd", &custom_requirements));
}
