use admin_client::{AdminConsole, LoginForm};
use anyhow::{Context, Result};
use colored::Colorize;

use crate::cli::{LoginArgs, OutputFormat};
use crate::output::{print_error, print_json, print_success, print_user};

pub async fn login(console: &AdminConsole, args: &LoginArgs, format: OutputFormat) -> Result<()> {
    let mut form = LoginForm::new(&args.username, &args.password).remember_me(args.remember_me);
    if let (Some(key), Some(code)) = (&args.captcha_key, &args.captcha_code) {
        form = form.captcha(key, code);
    }

    let result = console.session().login(&form).await;
    let session = console.session().session();
    if !session.is_authenticated() {
        result.context("Login failed")?;
        anyhow::bail!("Login failed");
    }

    print_success(&format!(
        "Signed in to {} as {}",
        console.client().base_url().as_str().cyan(),
        args.username.cyan()
    ));
    if !args.remember_me {
        println!("Tokens are kept in memory only and end with this process.");
    }
    match (result, session.user_info) {
        (Ok(()), Some(user)) => print_user(&user, format),
        (Err(e), _) => print_error(&format!("Profile unavailable: {e}")),
        (Ok(()), None) => {}
    }
    Ok(())
}

pub async fn logout(console: &AdminConsole) -> Result<()> {
    if !console.tokens().is_logged_in() {
        println!("Not signed in.");
    }
    console.session().logout().await;
    print_success("Signed out");
    Ok(())
}

pub async fn whoami(console: &AdminConsole, format: OutputFormat) -> Result<()> {
    if !console.tokens().is_logged_in() {
        print_error("Not signed in");
        return Ok(());
    }
    if console.session().restore()
        && let Some(user) = console.session().session().user_info
    {
        print_user(&user, format);
        return Ok(());
    }
    let user = console
        .session()
        .get_user_info()
        .await
        .context("Failed to load profile")?;
    print_user(&user, format);
    Ok(())
}

pub async fn captcha(console: &AdminConsole) -> Result<()> {
    let info = console
        .client()
        .captcha()
        .await
        .context("Failed to fetch captcha")?;
    print_json(&info);
    Ok(())
}
