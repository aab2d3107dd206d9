//! Customer session commands.
//!
//! Passwords are read from the first line of stdin so they never appear in
//! shell history or the process list.

use std::io::BufRead;

use clap::Subcommand;
use kp_storefront::StorefrontError;
use kp_storefront::graphql::RegisterInput;
use kp_storefront::state::AppState;
use secrecy::SecretString;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in; reads the password from stdin
    Login {
        /// Username or email
        #[arg(short, long)]
        username: String,
    },
    /// Create an account; reads the password from stdin
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Log out and forget stored credentials
    Logout,
    /// Exchange the refresh token for a new auth token
    Refresh,
    /// Show the signed-in customer
    Whoami,
}

/// Run a session command.
///
/// # Errors
///
/// Returns an error if the password cannot be read or the server rejects
/// the request.
#[allow(clippy::print_stdout)]
pub async fn run(state: &AppState, action: AuthAction) -> kp_storefront::Result<()> {
    let auth = state.auth();
    match action {
        AuthAction::Login { username } => {
            let password = read_password()?;
            let signed_in = auth.login(&username, &password).await?;
            println!(
                "Signed in as {}",
                signed_in
                    .user
                    .name
                    .as_deref()
                    .or(signed_in.user.username.as_deref())
                    .unwrap_or(&username)
            );
        }
        AuthAction::Register {
            username,
            email,
            first_name,
            last_name,
        } => {
            let password = read_password()?;
            let user = auth
                .register(RegisterInput {
                    username,
                    email,
                    password,
                    first_name,
                    last_name,
                })
                .await?;
            println!(
                "Registered {}. Log in to continue.",
                user.email.as_deref().unwrap_or(&user.id)
            );
        }
        AuthAction::Logout => {
            auth.logout();
            println!("Signed out.");
        }
        AuthAction::Refresh => {
            if auth.refresh().await {
                println!("Session refreshed.");
            } else {
                return Err(StorefrontError::BadRequest(
                    "session expired, log in again".to_string(),
                ));
            }
        }
        AuthAction::Whoami => match auth.current() {
            Some(signed_in) => {
                let user = &signed_in.user;
                println!("User #{}", user.database_id);
                if let Some(name) = &user.name {
                    println!("  Name:  {name}");
                }
                if let Some(email) = &user.email {
                    println!("  Email: {email}");
                }
                if let Some(id) = signed_in.customer.as_ref().and_then(|c| c.database_id) {
                    println!("  Customer #{id}");
                }
            }
            None => println!("Not signed in."),
        },
    }
    Ok(())
}

fn read_password() -> kp_storefront::Result<SecretString> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| StorefrontError::BadRequest(format!("failed to read password: {e}")))?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(StorefrontError::BadRequest(
            "password expected on stdin".to_string(),
        ));
    }
    Ok(SecretString::from(password.to_string()))
}
