mod schema;
mod store;

pub use schema::{song_schema, FILE_COLUMN, SONG_VIEW};
pub use store::{FileRecord, SqliteSongStore, StoreWriter, StoredSong};
