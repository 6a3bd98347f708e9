//! Sign-in for the user account that reads channel history.

use std::io::{BufRead, Write};

use grammers_client::{Client, SignInError};

use crate::config::TelegramSettings;
use crate::error::AppError;

/// Sign the user client in unless its session is already authorized.
///
/// The login code, and the 2FA password when none is configured, are read
/// from stdin, so the first run has to be interactive.
pub async fn ensure_user_signed_in(
    client: &Client,
    settings: &TelegramSettings,
) -> Result<(), AppError> {
    let authorized = client
        .is_authorized()
        .await
        .map_err(|e| AppError::Auth(format!("auth check failed: {}", e)))?;
    if authorized {
        return Ok(());
    }

    log::info!("User session not authorized, requesting a login code");
    let token = client
        .request_login_code(&settings.phone, &settings.api_hash)
        .await
        .map_err(|e| AppError::Auth(format!("failed to request login code: {}", e)))?;
    let code = prompt("Login code: ").await?;

    match client.sign_in(&token, &code).await {
        Ok(_user) => {}
        Err(SignInError::PasswordRequired(password_token)) => {
            let password = match &settings.password {
                Some(password) => password.clone(),
                None => {
                    let hint = password_token.hint().unwrap_or("none").to_string();
                    prompt(&format!("2FA password (hint: {}): ", hint)).await?
                }
            };
            client
                .check_password(password_token, password.as_str())
                .await
                .map_err(|e| AppError::Auth(format!("2FA failed: {}", e)))?;
        }
        Err(e) => return Err(AppError::Auth(format!("sign in failed: {}", e))),
    }

    log::info!("User client signed in");
    Ok(())
}

async fn prompt(label: &str) -> Result<String, AppError> {
    let label = label.to_string();
    tokio::task::spawn_blocking(move || {
        let mut stdout = std::io::stdout();
        write!(stdout, "{}", label)?;
        stdout.flush()?;
        read_answer(&mut std::io::stdin().lock())
    })
    .await
    .map_err(|e| AppError::Other(format!("prompt task failed: {}", e)))?
}

fn read_answer(reader: &mut impl BufRead) -> Result<String, AppError> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(AppError::Auth("stdin closed before sign-in finished".to_string()));
    }
    let answer = line.trim();
    if answer.is_empty() {
        return Err(AppError::Auth("empty answer".to_string()));
    }
    Ok(answer.to_string())
}
