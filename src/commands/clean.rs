//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::Blog;

/// Delete the generated site
pub fn run(blog: &Blog) -> Result<()> {
    if blog.public_dir.exists() {
        fs::remove_dir_all(&blog.public_dir)?;
        tracing::info!("Deleted: {:?}", blog.public_dir);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean() {
        let dir = tempfile::tempdir().unwrap();
        let blog = Blog::new(dir.path()).unwrap();
        fs::create_dir_all(blog.public_dir.join("post/a")).unwrap();
        fs::write(blog.public_dir.join("index.html"), "x").unwrap();

        run(&blog).unwrap();
        assert!(!blog.public_dir.exists());
        // nothing to clean is fine
        run(&blog).unwrap();
    }
}
