//! Local document store commands.

use anyhow::Context;
use clap::{Args, Subcommand};
use serde_json::Value;
use tripmate_core::{DocumentId, TripId};
use tripmate_store::{Collection, Document, DocumentStore, Scope};

/// Collection and parent trip of a document.
#[derive(Args, Debug)]
pub struct Location {
    /// Collection name (trips, itinerary, packing, tasks, profiles).
    #[arg(value_parser = parse_collection)]
    collection: Collection,

    /// Owning trip, for trip-scoped collections.
    #[arg(long)]
    trip: Option<TripId>,
}

impl Location {
    fn scope(&self) -> Scope {
        self.trip.clone().map_or(Scope::Global, Scope::Trip)
    }
}

#[derive(Subcommand, Debug)]
pub enum DocCommand {
    /// Print one document.
    Get {
        #[command(flatten)]
        location: Location,
        /// Document ID.
        id: DocumentId,
    },

    /// Create or overwrite a document from a JSON object.
    Put {
        #[command(flatten)]
        location: Location,
        /// Document body.
        body: String,
        /// Document ID; generated when omitted.
        #[arg(long)]
        id: Option<DocumentId>,
    },

    /// Delete one document.
    Delete {
        #[command(flatten)]
        location: Location,
        /// Document ID.
        id: DocumentId,
    },

    /// Print every document of a collection.
    List {
        #[command(flatten)]
        location: Location,
    },
}

fn parse_collection(name: &str) -> Result<Collection, String> {
    Collection::parse(name).ok_or_else(|| {
        let known: Vec<&str> = Collection::ALL.iter().map(Collection::as_str).collect();
        format!("unknown collection `{name}` (expected one of: {})", known.join(", "))
    })
}

fn print_document(document: &Document) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(document)?);
    Ok(())
}

/// Run one document command against `store`.
pub fn run(store: &impl DocumentStore, command: DocCommand) -> anyhow::Result<()> {
    match command {
        DocCommand::Get { location, id } => {
            let document = store
                .get(&location.scope(), location.collection, &id)?
                .with_context(|| format!("{} document {id} not found", location.collection))?;
            print_document(&document)
        }
        DocCommand::Put { location, body, id } => {
            let data: Value =
                serde_json::from_str(&body).context("document body is not valid JSON")?;
            let scope = location.scope();
            let document = match id {
                Some(id) => store.create_with_id(&scope, location.collection, id, data)?,
                None => store.create(&scope, location.collection, data)?,
            };
            tracing::info!(
                collection = %location.collection,
                id = %document.id,
                "Stored document"
            );
            print_document(&document)
        }
        DocCommand::Delete { location, id } => {
            store.delete(&location.scope(), location.collection, &id)?;
            println!("Deleted {} document {id}.", location.collection);
            Ok(())
        }
        DocCommand::List { location } => {
            let documents = store.list(&location.scope(), location.collection)?;
            if documents.is_empty() {
                println!("No {} documents.", location.collection);
            }
            for document in &documents {
                print_document(document)?;
            }
            Ok(())
        }
    }
}
