
use std::sync::Once;
use tracing::debug;

const F32_BYTES: usize = size_of::<f32>();

static REGISTER_SQLITE_VEC: Once = Once::new();

/// Make the sqlite-vec `vec0` module available to every SQLite connection
/// opened afterwards in this process
#[inline]
pub fn register_sqlite_vec() {
    REGISTER_SQLITE_VEC.call_once(|| {
        // SAFETY: `sqlite3_vec_init` is the extension entry point compiled into
        // the sqlite-vec crate against the same SQLite that sqlx links.
        // Registration happens once, before any pool connection is opened.
        unsafe {
            libsqlite3_sys::sqlite3_auto_extension(Some(std::mem::transmute(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
        debug!("Registered sqlite-vec extension");
    });
}

/// Serialize an embedding as little-endian `f32` bytes, the layout `vec0`
/// expects for `float[N]` columns
#[inline]
pub fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// Inverse of [`encode_embedding`]; `None` if the blob is not a whole number of floats
#[inline]
pub fn decode_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % F32_BYTES != 0 {
        return None;
    }

    Some(
        bytes
            .chunks_exact(F32_BYTES)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}
