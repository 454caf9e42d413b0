use anyhow::Context;
use clap::{Parser, Subcommand};
use skillswap_match_engine::{
    EngineConfig, MatchEngine, MatchQuery, NewAdminMessage, NewRating, NewSwapRequest,
    ProficiencyLevel, RequestDirection, RequestFilters, SearchFilters, SwapDecision,
    SwapRequestStatus,
};

#[derive(Parser)]
#[command(name = "skillswap-cli")]
#[command(about = "SkillSwap Match Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Database path (defaults to $DB_PATH, then skillswap.db)
    #[arg(short, long)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Import profiles from a JSON array of profile records
    Import {
        /// Path to the JSON file
        file: String,
    },

    /// Rank swap partners for a user
    Matches {
        user_id: String,

        /// Maximum results (0 = all)
        #[arg(short, long)]
        max_results: Option<usize>,

        /// Drop matches scoring below this
        #[arg(long)]
        min_score: Option<u32>,
    },

    /// Score one pair of users
    Score {
        user_id: String,
        other_id: String,
    },

    /// Browse the public directory
    Search {
        /// Name, location or skill substring
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// BEGINNER, INTERMEDIATE, ADVANCED or EXPERT
        #[arg(long)]
        level: Option<ProficiencyLevel>,

        #[arg(long)]
        availability: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Ban a user (or lift the ban)
    Ban {
        user_id: String,

        #[arg(long)]
        lift: bool,
    },

    /// Propose a skill swap to another user
    Request {
        sender_id: String,
        receiver_id: String,

        /// Skill you offer
        sender_skill: String,

        /// Skill you want from them
        receiver_skill: String,

        #[arg(short, long)]
        message: Option<String>,
    },

    /// List a user's swap requests
    Requests {
        user_id: String,

        /// sent, received or all
        #[arg(long, default_value = "all")]
        direction: RequestDirection,

        /// PENDING, ACCEPTED, REJECTED, COMPLETED or CANCELLED
        #[arg(short, long)]
        status: Option<SwapRequestStatus>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Accept (or reject) a request you received
    Respond {
        user_id: String,
        request_id: i64,

        #[arg(long)]
        reject: bool,
    },

    /// Withdraw a pending request you sent
    Withdraw {
        user_id: String,
        request_id: i64,
    },

    /// Rate an accepted or completed exchange 1-5
    Rate {
        user_id: String,
        request_id: i64,
        rating: u8,

        #[arg(short, long)]
        feedback: Option<String>,
    },

    /// Post an announcement to every user
    Announce {
        title: String,
        content: String,
    },

    /// List announcements
    Messages {
        /// Include deactivated messages
        #[arg(long)]
        all: bool,
    },

    /// Activate (or deactivate) an announcement
    ToggleMessage {
        message_id: i64,

        #[arg(long)]
        off: bool,
    },

    /// List the skill catalog
    Skills {
        /// Only skills awaiting review
        #[arg(long)]
        pending: bool,
    },

    /// Approve a skill (or reject it, removing it from every profile)
    ReviewSkill {
        name: String,

        #[arg(long)]
        reject: bool,
    },

    /// Get store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let engine = MatchEngine::new(&config.db_path)
        .await?
        .with_options(config.match_options());

    match cli.command {
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file))?;

            println!("📥 Importing profiles from {}", file);

            let report = engine
                .import_profiles(&raw)
                .await
                .with_context(|| format!("importing {}", file))?;

            for (id, reason) in &report.rejected {
                println!("   ⚠️ {}: {}", id, reason);
            }
            println!(
                "✅ Imported {} profiles ({} rejected)",
                report.imported,
                report.rejected.len()
            );
        }

        Commands::Matches { user_id, max_results, min_score } => {
            println!("🔍 Finding matches for: {}", user_id);

            let response = engine
                .find_matches(MatchQuery { user_id, max_results, min_score })
                .await?;

            println!(
                "\n✅ {} matches from {} candidates ({:.2}ms, {})",
                response.matches.len(),
                response.total_candidates,
                response.latency_ms,
                response.ranking_method
            );

            for (i, m) in response.matches.iter().enumerate() {
                println!("   {}. {}", i + 1, m.match_result.display());
            }
        }

        Commands::Score { user_id, other_id } => {
            let result = engine.score_pair(&user_id, &other_id).await?;

            println!("🤝 {} → {}: {}", user_id, other_id, result.score);
            for skill in &result.matched_skills {
                println!(
                    "   {} (level difference {})",
                    skill.user_offered, skill.level_difference
                );
            }
        }

        Commands::Search { query, category, location, level, availability, page, limit } => {
            let filters = SearchFilters {
                query,
                skill_category: category,
                location,
                skill_level: level,
                availability,
                page,
                limit,
            };

            let result = engine.search(&filters).await?;
            let p = result.pagination;

            println!(
                "📋 Page {}/{} ({} profiles)",
                p.current_page, p.total_pages, p.total_count
            );
            for profile in &result.profiles {
                let offered: Vec<&str> = profile.snapshot.offered().map(|c| c.name()).collect();
                println!(
                    "   {} [{}] - {} - ⭐ {:.1} ({})",
                    profile.name,
                    profile.snapshot.id,
                    profile.snapshot.location.as_deref().unwrap_or("N/A"),
                    profile.average_rating,
                    offered.join(", ")
                );
            }
        }

        Commands::Ban { user_id, lift } => {
            engine.set_banned(&user_id, !lift).await?;
            println!("✅ {} {}", user_id, if lift { "unbanned" } else { "banned" });
        }

        Commands::Request { sender_id, receiver_id, sender_skill, receiver_skill, message } => {
            let mut new = NewSwapRequest::new(sender_id, receiver_id, sender_skill, receiver_skill);
            new.message = message;

            let request = engine.create_request(&new).await?;
            println!(
                "📨 Request #{} sent: {} for {} ({})",
                request.id, request.sender_skill, request.receiver_skill, request.status
            );
        }

        Commands::Requests { user_id, direction, status, page, limit } => {
            let filters = RequestFilters { direction, status, page, limit };
            let result = engine.list_requests(&user_id, &filters).await?;
            let p = result.pagination;

            println!(
                "📋 Page {}/{} ({} requests)",
                p.current_page, p.total_pages, p.total_count
            );
            for r in &result.requests {
                let rating = r
                    .rating
                    .as_ref()
                    .map(|rating| format!(" - ⭐ {}", rating.rating))
                    .unwrap_or_default();
                println!(
                    "   #{} {} → {}: {} for {} [{}]{}",
                    r.id, r.sender_id, r.receiver_id, r.sender_skill, r.receiver_skill, r.status, rating
                );
            }
        }

        Commands::Respond { user_id, request_id, reject } => {
            let decision = if reject { SwapDecision::Reject } else { SwapDecision::Accept };
            let request = engine.respond_to_request(&user_id, request_id, decision).await?;
            println!("✅ Request #{} is now {}", request.id, request.status);
        }

        Commands::Withdraw { user_id, request_id } => {
            engine.delete_request(&user_id, request_id).await?;
            println!("✅ Request #{} withdrawn", request_id);
        }

        Commands::Rate { user_id, request_id, rating, feedback } => {
            let mut new = NewRating::new(request_id, user_id, rating);
            new.feedback = feedback;

            let stored = engine.rate_request(&new).await?;
            println!("⭐ Rated {} with {} (request #{})", stored.receiver_id, stored.rating, request_id);
        }

        Commands::Announce { title, content } => {
            let message = engine.post_message(&NewAdminMessage::new(title, content)).await?;
            println!("📢 Message #{} posted", message.id);
        }

        Commands::Messages { all } => {
            let messages = engine.messages(all).await?;

            println!("📢 {} messages", messages.len());
            for m in &messages {
                let marker = if m.is_active { "" } else { " (inactive)" };
                println!("   #{} {}{}: {}", m.id, m.title, marker, m.content);
            }
        }

        Commands::ToggleMessage { message_id, off } => {
            engine.set_message_active(message_id, !off).await?;
            println!(
                "✅ Message #{} {}",
                message_id,
                if off { "deactivated" } else { "activated" }
            );
        }

        Commands::Skills { pending } => {
            let skills = engine.list_skills(pending).await?;

            println!("🏷️ {} skills", skills.len());
            for skill in &skills {
                println!(
                    "   {} [{}] - {} - {} profiles",
                    skill.name,
                    skill.category.as_deref().unwrap_or("N/A"),
                    if skill.is_approved { "approved" } else { "pending" },
                    skill.claimed_by
                );
            }
        }

        Commands::ReviewSkill { name, reject } => {
            engine.review_skill(&name, !reject).await?;
            println!("✅ {} {}", name, if reject { "rejected" } else { "approved" });
        }

        Commands::Stats => {
            let stats = engine.store_stats().await?;

            println!("📊 Store Statistics:");
            println!("   Total profiles: {}", stats.total_profiles);
            println!("   Public profiles: {}", stats.public_profiles);
            println!("   Banned profiles: {}", stats.banned_profiles);
            println!("   Skills: {}", stats.total_skills);
            println!(
                "   Requests: {} ({} pending)",
                stats.total_requests, stats.pending_requests
            );
            println!("   Ratings: {}", stats.total_ratings);
        }
    }

    Ok(())
}
