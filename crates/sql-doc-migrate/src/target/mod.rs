//! Target-side operations: bulk loading documents into a collection.

use tracing::debug;

use crate::core::traits::TargetCollection;
use crate::core::value::Document;
use crate::error::{MigrateError, Result};

/// Load one batch of documents into a collection with a single bulk insert.
///
/// Reports either full success (every document acknowledged) or a write
/// error; it never claims partial counts it cannot verify. If the target
/// acknowledges fewer documents than were submitted the batch is treated as
/// failed. Retry policy belongs to the caller, not here.
pub async fn load_batch(collection: &dyn TargetCollection, documents: &[Document]) -> Result<u64> {
    if documents.is_empty() {
        return Ok(0);
    }

    let written = collection.insert_many(documents).await?;

    if written != documents.len() as u64 {
        return Err(MigrateError::write(
            collection.name(),
            format!(
                "target acknowledged {} of {} documents",
                written,
                documents.len()
            ),
        ));
    }

    debug!(
        collection = collection.name(),
        documents = written,
        "batch written"
    );

    Ok(written)
}
