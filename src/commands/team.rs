use crate::{
    commands::load_identity,
    db::grants::Grants,
    libs::{
        grant::{AccessManager, GrantStatus, QrPayload},
        messages::Message,
        view::View,
    },
    msg_info, msg_print, msg_success,
};
use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::warn;

#[derive(Debug, Args)]
pub struct TeamArgs {
    #[command(subcommand)]
    command: TeamCommand,
}

#[derive(Debug, Subcommand)]
enum TeamCommand {
    /// Print a one-time link code for your manager
    Qr,
    /// Redeem a worker's link code
    Scan {
        #[arg(required_unless_present = "token", help = "Code printed by `team qr`")]
        payload: Option<String>,
        #[arg(long, conflicts_with = "payload", help = "Bare token instead of the full code")]
        token: Option<String>,
    },
    /// Approve a pending link to your hours
    Approve { id: String },
    /// Remove someone's access to your hours
    Revoke { id: String },
    /// Who can see your hours, and whose hours you can see
    List,
}

pub fn cmd(args: TeamArgs) -> Result<()> {
    let (config, user) = load_identity()?;
    let settings = config.report.settings();
    let mut access = AccessManager::new(Grants::new()?, config.access.policy());

    match args.command {
        TeamCommand::Qr => {
            let token = access.generate_token(&user.id, &user.name)?;
            let payload = QrPayload::for_token(&token).to_json()?;
            msg_success!(Message::TokenGenerated(settings.format_time(token.expires_at)));
            msg_info!(Message::QrPayloadHint);
            // The code goes to stdout untouched so it can be piped.
            println!("{}", payload);
        }
        TeamCommand::Scan { payload, token } => {
            let grant = match token {
                Some(token) => access.redeem(token.trim(), &user.id)?,
                None => access.redeem_payload(&payload.unwrap_or_default(), &user.id)?,
            };
            let name = grant.label.clone().unwrap_or_else(|| grant.owner_id.clone());
            if grant.status == GrantStatus::Active {
                msg_success!(Message::LinkedToWorker(name));
            } else {
                msg_info!(Message::LinkPendingApproval(name));
            }
        }
        TeamCommand::Approve { id } => {
            let grant = access.approve(&id, &user.id)?;
            msg_success!(Message::GrantApproved(grant.id));
        }
        TeamCommand::Revoke { id } => {
            let grant = access.revoke(&id, &user.id)?;
            msg_success!(Message::GrantRevoked(grant.id));
        }
        TeamCommand::List => {
            // Listing is read-only; a failing store shows as an empty list.
            let shared: Vec<_> = access
                .owner_grants(&user.id)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Failed to load shared grants");
                    Vec::new()
                })
                .into_iter()
                .filter(|g| g.status != GrantStatus::Revoked)
                .collect();
            let workers = access.viewer_grants(&user.id).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load worker grants");
                Vec::new()
            });
            if shared.is_empty() && workers.is_empty() {
                msg_info!(Message::NoGrants);
                return Ok(());
            }

            if !shared.is_empty() {
                msg_print!(Message::SharedWithHeader, true);
                View::grants(&shared, &settings, true);
            }
            if !workers.is_empty() {
                msg_print!(Message::WorkersHeader, true);
                View::grants(&workers, &settings, false);
            }
        }
    }
    Ok(())
}
