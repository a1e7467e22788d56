use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 10] = [
        "RUST_LOG",
        "CHECKOUT_HOST",
        "CHECKOUT_PORT",
        "PORT",
        "CHECKOUT_DATABASE_URL",
        "CHECKOUT_WEBHOOK_IP_WHITELIST",
        "CHECKOUT_USE_X_FORWARDED_FOR",
        "CHECKOUT_USE_FORWARDED",
        "PAYOS_API_URL",
        "PAYOS_TIMEOUT_SECS",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    let client_id = env::var("PAYOS_CLIENT_ID").map(|s| if s.is_empty() { "Not set" } else { "Set" });
    println!("  {:<35} {:<15}", "PAYOS_CLIENT_ID", client_id.unwrap_or("Not set"));
}
