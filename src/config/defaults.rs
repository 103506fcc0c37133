//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// [input] Section Defaults
// ============================================================================

pub mod input {
    use std::path::PathBuf;

    pub fn source() -> PathBuf {
        "source/_posts".into()
    }
}

// ============================================================================
// [output] Section Defaults
// ============================================================================

pub mod output {
    use std::path::PathBuf;

    pub fn path() -> PathBuf {
        "typecho_import.sql".into()
    }
}

// ============================================================================
// [sql] Section Defaults
// ============================================================================

pub mod sql {
    pub fn table_prefix() -> String {
        "typecho_".into()
    }

    pub fn author() -> String {
        "admin".into()
    }

    pub fn author_id() -> u32 {
        1
    }

    pub fn cid_start() -> u32 {
        1
    }

    pub fn mid_start() -> u32 {
        1
    }
}

// ============================================================================
// [assets] Section Defaults
// ============================================================================

pub mod assets {
    pub fn url_prefix() -> String {
        "/hexo-assets".into()
    }
}
