use anyhow::{anyhow, Result};
use clap::Args;
use desk_http::{RequestBuilder, Response, ResponseBody, ResponseType};

#[derive(Args)]
pub struct RequestSubCommand {
    /// Request path, relative to the base URL
    pub path: String,
    /// JSON request body
    #[arg(short, long)]
    data: Option<String>,
    /// Extra header as `Name: value`, may be repeated
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,
    /// Print the response body as received
    #[arg(long)]
    raw: bool,
}

pub async fn request(builder: RequestBuilder, sub_command_args: &RequestSubCommand) -> Result<()> {
    let mut builder = builder;

    for header in &sub_command_args.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid header '{}', expected 'Name: value'", header))?;
        builder = builder.header(name.trim(), value.trim());
    }

    if let Some(data) = &sub_command_args.data {
        let body: serde_json::Value = serde_json::from_str(data)?;
        builder = builder.json(&body);
    }

    if sub_command_args.raw {
        builder = builder.response_type(ResponseType::Text);
    }

    match builder.send().await {
        Ok(response) => print_response(&response),
        Err(err) => {
            if let Some(response) = err.response() {
                print_response(response)?;
            }
            Err(err.into())
        }
    }
}

fn print_response(response: &Response) -> Result<()> {
    eprintln!("{} {}", response.status(), response.status_text());

    match response.body() {
        ResponseBody::Json(value) => println!("{}", serde_json::to_string_pretty(value)?),
        ResponseBody::Text(text) => println!("{}", text),
        ResponseBody::Binary(bytes) => eprintln!("<{} bytes>", bytes.len()),
        ResponseBody::Empty => {}
    }
    Ok(())
}
