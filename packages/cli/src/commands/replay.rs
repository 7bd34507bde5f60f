use crate::config::Config;
use crate::render::{summary, TreePrinter};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use pin_common::{CommentSource, JsonFileSource};
use pin_engine::{
    CounterBoard, Item, ItemId, OperationToken, Payload, SubmitOutcome, ThreadSession,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Comment listing the session starts from
    pub comments: PathBuf,

    /// Script of optimistic actions and server outcomes
    pub script: PathBuf,

    /// Print the final state as JSON
    #[arg(long)]
    pub json: bool,
}

/// Replay script file format
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default)]
    pub likes: Vec<LikeSeed>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct LikeSeed {
    pub target: String,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub count: i64,
}

/// One scripted action
///
/// `as` names the pending operation so later steps can settle it with `ref`.
/// A `parent` starting with `$` refers to an earlier insert by name.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    Insert {
        #[serde(rename = "as")]
        label: String,
        #[serde(default)]
        parent: Option<String>,
        content: String,
    },
    Confirm {
        #[serde(rename = "ref")]
        label: String,
        id: String,
        #[serde(default)]
        content: Option<String>,
    },
    Reject {
        #[serde(rename = "ref")]
        label: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Like {
        #[serde(rename = "as")]
        label: String,
        target: String,
    },
    ConfirmLike {
        #[serde(rename = "ref")]
        label: String,
    },
    RejectLike {
        #[serde(rename = "ref")]
        label: String,
    },
}

/// Drives a thread session and a counter board through a script
pub struct Replayer {
    pub session: ThreadSession,
    pub board: CounterBoard,
    tokens: HashMap<String, OperationToken>,
    provisional: HashMap<String, ItemId>,
    targets: Vec<String>,
}

impl Replayer {
    pub fn new(session: ThreadSession, floor: i64) -> Self {
        Self {
            session,
            board: CounterBoard::new(floor),
            tokens: HashMap::new(),
            provisional: HashMap::new(),
            targets: Vec::new(),
        }
    }

    pub fn seed_likes(&mut self, likes: &[LikeSeed]) {
        for seed in likes {
            self.board.seed_like(&seed.target, seed.liked, seed.count);
            self.track_target(&seed.target);
        }
    }

    /// Like state of every target the script touched, in first-seen order
    pub fn likes(&self) -> Vec<(String, bool, i64)> {
        self.targets
            .iter()
            .filter_map(|t| self.board.like(t).map(|(liked, count)| (t.clone(), liked, count)))
            .collect()
    }

    /// Run one step; the returned line describes what happened
    pub fn step(&mut self, step: &Step) -> Result<String> {
        match step {
            Step::Insert {
                label,
                parent,
                content,
            } => {
                let parent = parent.as_deref().map(|p| self.resolve_parent(p)).transpose()?;
                let token = self
                    .session
                    .insert(parent.as_ref(), Payload::text(content.as_str()))?;
                let provisional_id = self
                    .session
                    .operation(token)
                    .and_then(|op| op.provisional_id())
                    .cloned()
                    .ok_or_else(|| anyhow!("{} left no provisional item", token))?;

                let line = format!("insert {} as {} ({})", label, provisional_id, token);
                self.tokens.insert(label.clone(), token);
                self.provisional.insert(label.clone(), provisional_id);
                Ok(line)
            }
            Step::Confirm { label, id, content } => {
                let token = self.token(label)?;
                let request = self.session.submission(token)?;
                let mut payload = request.payload;
                if let Some(content) = content {
                    payload.content = content.clone();
                }
                let item = Item {
                    id: ItemId::canonical(id.as_str()),
                    parent_id: request.parent_id,
                    payload,
                    children: Vec::new(),
                };
                self.session.settle(token, SubmitOutcome::Confirmed(item))?;
                Ok(format!("confirm {} as {}", label, id))
            }
            Step::Reject { label, reason } => {
                let token = self.token(label)?;
                let reason = reason.clone().unwrap_or_else(|| "rejected".to_string());
                let retired = self
                    .session
                    .settle(token, SubmitOutcome::Failed(reason.clone()))?;
                let mut line = format!("reject {} ({})", label, reason);
                if !retired.is_empty() {
                    let names: Vec<String> = retired.iter().map(|t| t.to_string()).collect();
                    line.push_str(&format!(", retired {}", names.join(", ")));
                }
                Ok(line)
            }
            Step::Like { label, target } => {
                let token = self.board.toggle_like(target);
                self.track_target(target);
                self.tokens.insert(label.clone(), token);
                let (liked, count) = self.board.like(target).unwrap_or((false, 0));
                Ok(format!(
                    "like {} on {}: {} ({})",
                    label,
                    target,
                    if liked { "liked" } else { "unliked" },
                    count
                ))
            }
            Step::ConfirmLike { label } => {
                let token = self.token(label)?;
                self.board.confirm(token)?;
                Ok(format!("confirm like {}", label))
            }
            Step::RejectLike { label } => {
                let token = self.token(label)?;
                self.board.revert(token)?;
                Ok(format!("revert like {}", label))
            }
        }
    }

    fn token(&self, label: &str) -> Result<OperationToken> {
        self.tokens
            .get(label)
            .copied()
            .ok_or_else(|| anyhow!("Unknown operation: {}", label))
    }

    fn resolve_parent(&self, raw: &str) -> Result<ItemId> {
        match raw.strip_prefix('$') {
            Some(label) => self
                .provisional
                .get(label)
                .map(|id| self.session.canonical_id(id))
                .ok_or_else(|| anyhow!("Unknown insert: {}", label)),
            None => Ok(ItemId::parse(raw)),
        }
    }

    fn track_target(&mut self, target: &str) {
        if !self.targets.iter().any(|t| t == target) {
            self.targets.push(target.to_string());
        }
    }
}

pub fn replay(args: ReplayArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let base = PathBuf::from(cwd);

    let comments_path = base.join(&args.comments);
    let records = JsonFileSource::new(&comments_path)
        .fetch()
        .with_context(|| format!("Failed to read comments from {}", comments_path.display()))?;

    let script_path = base.join(&args.script);
    let script: Script = serde_json::from_str(
        &std::fs::read_to_string(&script_path)
            .with_context(|| format!("Failed to read script {}", script_path.display()))?,
    )?;

    let session = ThreadSession::load(
        args.comments.display().to_string(),
        records,
        config.engine.clone(),
    );
    let mut replayer = Replayer::new(session, config.engine.counter_floor);
    replayer.seed_likes(&script.likes);

    let mut failures = 0;
    for (i, step) in script.steps.iter().enumerate() {
        match replayer.step(step) {
            Ok(line) => {
                if !args.json {
                    println!("  {} {}", "✓".green(), line);
                }
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(step = i + 1, error = %err, "Step failed");
                if !args.json {
                    println!("  {} step {}: {}", "✗".red(), i + 1, err);
                }
            }
        }
    }

    let forest = replayer.session.forest();
    let likes = replayer.likes();

    if args.json {
        let likes: Vec<serde_json::Value> = likes
            .iter()
            .map(|(target, liked, count)| {
                serde_json::json!({ "target": target, "liked": liked, "count": count })
            })
            .collect();
        let out = serde_json::json!({
            "forest": forest,
            "likes": likes,
            "pending": replayer.session.pending_count(),
            "failedSteps": failures,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{} {}", "Thread".green().bold(), summary(forest).dimmed());
    println!();
    println!("{}", TreePrinter::render(forest));

    if !likes.is_empty() {
        println!();
        println!("{}", "Likes".green().bold());
        for (target, liked, count) in likes {
            let mark = if liked { "♥".red() } else { "♡".normal() };
            println!("  {} {} {}", mark, target, count);
        }
    }

    if failures > 0 {
        println!();
        println!("{} {} step(s) failed", "⚠️".yellow(), failures);
    }

    Ok(())
}
