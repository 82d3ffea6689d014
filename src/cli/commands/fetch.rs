//! Fetch command - run one request through the active cache

use super::Workspace;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{ShellcacheError, ShellcacheResult};
use crate::http::{Request, Response};
use crate::network::{Network, OfflineNetwork};
use crate::worker::{Intercepted, ResponseSource};
use console::style;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> ShellcacheResult<()> {
    let workspace = Workspace::open(config)?;
    let network: Arc<dyn Network> = if args.offline {
        Arc::new(OfflineNetwork)
    } else {
        config.network()?
    };

    let url = resolve(workspace.scope().base(), &args.path)?;
    let request = Request::new(args.method, url);
    let registration = workspace.registration(network.clone()).await?;

    let (response, source) = match registration.interceptor() {
        Ok(interceptor) => match interceptor.handle(request).await {
            Intercepted::Responded(handled) => {
                info!("{} {} ({})", handled.source, handled.priority, handled.response.status);
                if let Some(refresh) = handled.refresh {
                    if refresh.await.is_err() {
                        debug!("Background refresh did not complete");
                    }
                }
                (handled.response, Some(handled.source))
            }
            Intercepted::Passthrough(request) => {
                debug!("Not intercepted: {} {}", request.method(), request.url());
                (passthrough(network.as_ref(), &request).await?, None)
            }
        },
        Err(ShellcacheError::NoActiveWorker) => {
            debug!("No active worker, going to the network");
            (passthrough(network.as_ref(), &request).await?, None)
        }
        Err(e) => return Err(e),
    };

    print_response(&response, source, args.include)
}

/// Resolve a path or absolute URL against the origin base
fn resolve(base: &Url, path: &str) -> ShellcacheResult<Url> {
    Url::parse(path)
        .or_else(|_| base.join(path))
        .map_err(|e| ShellcacheError::OriginInvalid {
            url: path.to_string(),
            reason: e.to_string(),
        })
}

async fn passthrough(network: &dyn Network, request: &Request) -> ShellcacheResult<Response> {
    Ok(network.fetch(request).await?)
}

fn print_response(
    response: &Response,
    source: Option<ResponseSource>,
    include: bool,
) -> ShellcacheResult<()> {
    if include {
        println!(
            "{} {}",
            style(response.status).bold(),
            response.status_text
        );
        if let Some(source) = source {
            println!("{}: {}", style("x-shellcache-source").dim(), source);
        }
        for (name, value) in &response.headers {
            println!("{}: {}", style(name).dim(), value);
        }
        println!();
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&response.body)
        .and_then(|_| stdout.flush())
        .map_err(|e| ShellcacheError::io("writing response body", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_against_base() {
        let base = Url::parse("https://example.org/router/").unwrap();
        assert_eq!(
            resolve(&base, "./app.js").unwrap().as_str(),
            "https://example.org/router/app.js"
        );
        assert_eq!(
            resolve(&base, "https://cdn.example.com/x.js").unwrap().as_str(),
            "https://cdn.example.com/x.js"
        );
    }
}
