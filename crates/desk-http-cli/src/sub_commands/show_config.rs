use anyhow::Result;
use desk_http::HttpClient;

pub fn show_config(client: &HttpClient) -> Result<()> {
    let config = client.config();

    println!("base_url: {}", config.base_url);
    println!("timeout_ms: {}", config.timeout.as_millis());
    println!("embedded: {}", config.embedded);
    match (&config.prefix_rule, config.embedded) {
        (Some(rule), true) => println!("prefix_rewrite: {} -> {}", rule.from, rule.to),
        _ => println!("prefix_rewrite: off"),
    }

    Ok(())
}
