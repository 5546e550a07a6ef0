//! Login / logout and profile commands.

use anyhow::Result;
use opsdesk_client::{Console, Credentials};

use super::print_value;

/// Log in and cache the profile.
pub async fn login(console: &Console, phone: &str, password: &str) -> Result<()> {
    let credentials = Credentials::new(phone, password);
    let resp = console
        .login(&credentials)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

    if resp.token.is_none() {
        println!("Logged in as {} (session cookie).", phone);
    } else {
        println!("Logged in as {}.", phone);
    }
    Ok(())
}

/// Log out on the server and forget the local token.
pub async fn logout(console: &Console) -> Result<()> {
    if !console.has_session()? {
        println!("Not logged in.");
        return Ok(());
    }
    console.logout().await?;
    println!("Logged out.");
    Ok(())
}

/// Show the signed-in user.
pub async fn whoami(console: &Console, output_json: bool) -> Result<()> {
    let profile = console.me().await?;
    if output_json {
        return print_value(&serde_json::to_value(&profile)?, true);
    }

    let id = profile.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "-".into());
    println!("ID:      {}", id);
    println!("Name:    {}", profile.name.as_deref().unwrap_or("-"));
    println!("Phone:   {}", profile.phone.as_deref().unwrap_or("-"));
    println!("Tasks:   {}", profile.tasks.len());
    Ok(())
}

/// Exit status reflects whether `code` is granted.
pub async fn can(console: &Console, code: &str) -> Result<bool> {
    console.me().await?;
    let granted = console.capabilities().has(code);
    println!("{}", if granted { "yes" } else { "no" });
    Ok(granted)
}

/// Dashboard statistics.
pub async fn dashboard(console: &Console, output_json: bool) -> Result<()> {
    let stats = console.dashboard_stats().await?;
    print_value(&stats, output_json)
}
