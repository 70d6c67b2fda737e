mod domain;
mod ports;
mod application;
mod infrastructure;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::{env, path::Path, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    application::{
        resolve_format, resolve_repo, resolve_token, DiagnosticLog, DiscussionService, ErrorContext,
        ResilientExecutor, SearchFilter,
    },
    domain::{AppError, Config, ListOptions},
    infrastructure::{
        adapters::github::GitHubAdapter,
        cli::{
            order_from,
            render::{render_comment, render_created, render_detail, render_discussions},
            Cli, Commands, ConfigAction,
        },
        store::{state_dir, FileConfigStore, FileCredentialStore},
    },
    ports::{ConfigStore, CredentialStore},
};

const TOKEN_ENV: &str = "GITHUB_TOKEN";
const API_URL_ENV: &str = "GH_DISCUSSIONS_API_URL";
const DEBUG_ENV: &str = "DEBUG";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for command output
    let filter = if cli.verbose {
        "gh_discussions=debug,info"
    } else {
        "gh_discussions=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let home = state_dir();
    let mut executor = ResilientExecutor::new().with_debug(env::var_os(DEBUG_ENV).is_some());
    if let Ok(dir) = &home {
        executor = executor.with_diagnostics(DiagnosticLog::new(dir.join("logs")));
    }
    let executor = Arc::new(executor);
    let home = home.unwrap_or_else(|e| executor.abort(e, &ErrorContext::new("locate state directory")));

    let credentials = FileCredentialStore::new(&home);
    let config_store = FileConfigStore::new(&home);

    match cli.command {
        Commands::List {
            repo,
            first,
            after,
            sort,
            order,
            format,
        } => {
            let repo = repo_or_default(repo, &config_store, &executor, "list discussions").await;
            let service = connect(&credentials, &executor, None).await;
            let options = ListOptions {
                first,
                after,
                order_by: order_from(sort, order),
            };

            let discussions = service
                .list(&repo, options)
                .await
                .unwrap_or_else(|report| executor.exit_with(&report));
            let format = resolve_format(format, &config_store).await;
            emit(
                render_discussions(&discussions, format),
                &executor,
                "list discussions",
            );
        }

        Commands::Show {
            number,
            repo,
            comments,
            format,
        } => {
            let repo = repo_or_default(repo, &config_store, &executor, "show discussion").await;
            let service = connect(&credentials, &executor, comments).await;

            let detail = service
                .show(&repo, &number)
                .await
                .unwrap_or_else(|report| executor.exit_with(&report));
            let format = resolve_format(format, &config_store).await;
            emit(
                render_detail(&detail, format),
                &executor,
                "show discussion",
            );
        }

        Commands::Comment {
            number,
            message,
            repo,
        } => {
            let repo = repo_or_default(repo, &config_store, &executor, "add comment").await;
            let service = connect(&credentials, &executor, None).await;

            let comment = service
                .comment(&repo, &number, &message)
                .await
                .unwrap_or_else(|report| executor.exit_with(&report));
            println!("✓ Comment posted successfully!");
            print!("{}", render_comment(&comment));
        }

        Commands::Create {
            title,
            body,
            repo,
            category,
        } => {
            let repo = repo_or_default(repo, &config_store, &executor, "create discussion").await;
            let service = connect(&credentials, &executor, None).await;

            let discussion = service
                .create(&repo, &title, &body, category.as_deref())
                .await
                .unwrap_or_else(|report| executor.exit_with(&report));
            print!("{}", render_created(&discussion));
        }

        Commands::Search {
            query,
            repo,
            author,
            category,
            limit,
            format,
        } => {
            let repo = repo_or_default(repo, &config_store, &executor, "search discussions").await;
            let service = connect(&credentials, &executor, None).await;
            let filter = SearchFilter {
                query,
                author,
                category,
                limit,
            };

            let discussions = service
                .search(&repo, &filter)
                .await
                .unwrap_or_else(|report| executor.exit_with(&report));
            let format = resolve_format(format, &config_store).await;
            emit(
                render_discussions(&discussions, format),
                &executor,
                "search discussions",
            );
        }

        Commands::Config { action } => {
            run_config(action, &home, &credentials, &config_store, &executor).await;
        }
    }

    Ok(())
}

/// Builds the service for commands that talk to GitHub.
async fn connect(
    credentials: &FileCredentialStore,
    executor: &Arc<ResilientExecutor>,
    comment_limit: Option<u32>,
) -> DiscussionService {
    let context = ErrorContext::new("authenticate");
    let token = resolve_token(env::var(TOKEN_ENV).ok(), credentials)
        .await
        .unwrap_or_else(|e| executor.abort(e, &context));

    let adapter = match env::var(API_URL_ENV) {
        Ok(endpoint) => GitHubAdapter::with_endpoint(&token, endpoint),
        Err(_) => GitHubAdapter::new(&token),
    }
    .unwrap_or_else(|e| executor.abort(e, &context));
    let adapter = match comment_limit {
        Some(limit) => adapter.with_comment_limit(limit),
        None => adapter,
    };

    DiscussionService::new(Arc::new(adapter), executor.clone())
}

async fn repo_or_default(
    repo: Option<String>,
    config_store: &FileConfigStore,
    executor: &ResilientExecutor,
    operation: &str,
) -> String {
    resolve_repo(repo, config_store)
        .await
        .unwrap_or_else(|e| executor.abort(e, &ErrorContext::new(operation)))
}

fn emit(rendered: Result<String, AppError>, executor: &ResilientExecutor, operation: &str) {
    match rendered {
        Ok(text) => print!("{}", text),
        Err(e) => executor.abort(e, &ErrorContext::new(operation)),
    }
}

async fn run_config(
    action: ConfigAction,
    home: &Path,
    credentials: &FileCredentialStore,
    config_store: &FileConfigStore,
    executor: &ResilientExecutor,
) {
    match action {
        ConfigAction::SetToken { token, no_verify } => {
            let context = ErrorContext::new("save token");
            if token.trim().is_empty() {
                executor.abort(AppError::validation("Token cannot be empty"), &context);
            }

            if !no_verify {
                let candidate = token.as_str();
                let valid = executor
                    .run(move || credentials.validate_token(candidate), &context)
                    .await;
                if !valid {
                    executor.abort(
                        AppError::authentication("GitHub did not accept this token"),
                        &context,
                    );
                }
            }

            credentials
                .set_token(&token)
                .await
                .unwrap_or_else(|e| executor.abort(e, &context));
            println!("✓ Token saved");
        }

        ConfigAction::SetRepo { repo } => {
            let context = ErrorContext::new("set default repository").with_repository(&repo);
            config_store
                .set_default_repo(&repo)
                .await
                .unwrap_or_else(|e| executor.abort(e, &context));
            println!("✓ Default repository set to {}", repo);
        }

        ConfigAction::SetFormat { format } => {
            let patch = Config {
                output_format: Some(format),
                ..Config::default()
            };
            config_store
                .update_config(patch)
                .await
                .unwrap_or_else(|e| executor.abort(e, &ErrorContext::new("set output format")));
            println!("✓ Output format set to {}", format);
        }

        ConfigAction::Show => {
            let config = config_store
                .get_config()
                .await
                .unwrap_or_else(|e| executor.abort(e, &ErrorContext::new("show configuration")));
            let stored = credentials
                .get_token()
                .await
                .unwrap_or_else(|e| executor.abort(e, &ErrorContext::new("show configuration")));
            let token_status = if env::var(TOKEN_ENV).is_ok() {
                "✓ Set (GITHUB_TOKEN)"
            } else if stored.is_some() {
                "✓ Set"
            } else {
                "✗ Not set"
            };

            println!("Configuration ({}):", home.display());
            println!(
                "  Default repository: {}",
                config.default_repo.as_deref().unwrap_or("(none)")
            );
            println!(
                "  Output format: {}",
                config.output_format.unwrap_or_default()
            );
            println!("  Token: {}", token_status);
        }

        ConfigAction::ClearToken => {
            credentials
                .clear_token()
                .await
                .unwrap_or_else(|e| executor.abort(e, &ErrorContext::new("clear token")));
            println!("✓ Token removed");
        }
    }
}
