//! Prints an Argon2 hash for `auth.initial_password_hash` /
//! `SIGNAGE_INITIAL_PASSWORD_HASH`.

use std::io::{self, Write};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};

const MIN_LEN: usize = 6;

fn main() -> anyhow::Result<()> {
    eprint!("New admin password: ");
    io::stderr().flush()?;

    let mut password = String::new();
    io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']);

    if password.len() < MIN_LEN {
        anyhow::bail!("password must be at least {MIN_LEN} characters");
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    println!("{hash}");
    Ok(())
}
