use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use membermatch::{
    config::{
        DEFAULT_BATCH_SIZE, DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_DIMENSIONS,
        DEFAULT_INDEX, DEFAULT_LIMIT, DEFAULT_NUM_CANDIDATES, DEFAULT_VOYAGE_MODEL,
        DEFAULT_VOYAGE_URL,
    },
    patient::{display_id, display_value, Neighbor},
    vector::Similarity,
    MatchError, MongoConfig, NearestMatches, SearchConfig, SeedConfig,
};
use serde_json::json;

/// Find the patients nearest to a randomly sampled one
#[derive(Parser, Debug)]
#[command(name = "membermatch")]
#[command(version)]
pub struct Cli {
    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", hide_env_values = true, global = true)]
    pub mongodb_uri: Option<String>,

    #[arg(long, env = "MEMBERMATCH_DB", default_value = DEFAULT_DATABASE, global = true)]
    pub database: String,

    #[arg(long, env = "MEMBERMATCH_COLLECTION", default_value = DEFAULT_COLLECTION, global = true)]
    pub collection: String,

    /// Run against a JSON snapshot of the collection; takes precedence over MongoDB
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample one embedded record and print its nearest neighbors
    Nearest(NearestArgs),

    /// Embed identity texts that have no embedding yet
    Seed(SeedArgs),
}

#[derive(Args, Debug)]
pub struct NearestArgs {
    /// Atlas vector search index name
    #[arg(long, default_value = DEFAULT_INDEX)]
    pub index: String,

    /// Candidates the index examines before ranking
    #[arg(long, default_value_t = DEFAULT_NUM_CANDIDATES)]
    pub num_candidates: usize,

    /// Neighbors to return
    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Scoring used with --snapshot; set it to the Atlas index's similarity
    #[arg(long, value_enum, default_value_t = Similarity::Cosine)]
    pub similarity: Similarity,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, env = "VOYAGE_API_KEY", hide_env_values = true)]
    pub voyage_api_key: Option<String>,

    #[arg(long, env = "VOYAGE_API_URL", default_value = DEFAULT_VOYAGE_URL)]
    pub voyage_url: String,

    #[arg(long, default_value = DEFAULT_VOYAGE_MODEL)]
    pub model: String,

    /// Expected embedding length; any other length aborts the run
    #[arg(long, default_value_t = DEFAULT_DIMENSIONS)]
    pub dimensions: usize,

    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn mongo_config(&self) -> Result<MongoConfig, MatchError> {
        let uri = self.mongodb_uri.clone().ok_or(MatchError::MissingSetting("MONGODB_URI"))?;
        Ok(MongoConfig { uri, database: self.database.clone(), collection: self.collection.clone() })
    }
}

impl From<&NearestArgs> for SearchConfig {
    fn from(args: &NearestArgs) -> Self {
        SearchConfig {
            index: args.index.clone(),
            num_candidates: args.num_candidates,
            limit: args.limit,
        }
    }
}

impl From<&SeedArgs> for SeedConfig {
    fn from(args: &SeedArgs) -> Self {
        SeedConfig {
            api_url: args.voyage_url.clone(),
            api_key: args.voyage_api_key.clone().unwrap_or_default(),
            model: args.model.clone(),
            dimensions: args.dimensions,
            batch_size: args.batch_size,
        }
    }
}

pub fn render(matches: &NearestMatches, format: OutputFormat) -> Result<String, MatchError> {
    match format {
        OutputFormat::Text => Ok(render_text(matches)),
        OutputFormat::Json => {
            let member = &matches.seed.member;
            let value = json!({
                "seed": {
                    "_id": matches.seed.id,
                    "firstName": member.first_name,
                    "lastName": member.last_name,
                    "birthDate": member.birth_date,
                    "memberGroupID": member.member_group_id,
                },
                "neighbors": matches.neighbors,
            });
            Ok(serde_json::to_string_pretty(&value)?)
        }
    }
}

fn render_text(matches: &NearestMatches) -> String {
    let member = &matches.seed.member;
    let mut out = format!(
        "Seed {}: {} {}, born {}, group {}\n",
        display_id(&matches.seed.id),
        display_value(member.first_name.as_ref()),
        display_value(member.last_name.as_ref()),
        display_value(member.birth_date.as_ref()),
        display_value(member.member_group_id.as_ref()),
    );

    if matches.neighbors.is_empty() {
        out.push_str("No neighbors found\n");
        return out;
    }

    out.push_str(&format!("Top {} neighbors:\n", matches.neighbors.len()));
    for (rank, neighbor) in matches.neighbors.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", rank + 1, render_neighbor(neighbor)));
    }
    out
}

fn render_neighbor(n: &Neighbor) -> String {
    format!(
        "ID: {}, Score: {:.4}, {} {}, born {}, group {}",
        display_id(&n.id),
        n.score,
        display_value(n.first_name.as_ref()),
        display_value(n.last_name.as_ref()),
        display_value(n.birth_date.as_ref()),
        display_value(n.member_group_id.as_ref()),
    )
}
