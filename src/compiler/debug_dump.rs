//! Writes the compiled container to a file for inspection.
//!
//! The dump is JSON and includes the compiler log. Parent directories are created
//! as needed and an existing file is overwritten.

use std::path::PathBuf;
use tracing::info;

use super::CompilerPass;
use crate::container::ContainerBuilder;
use crate::core::Result;
use crate::dumper::{DumpFormat, Dumper};

/// Does nothing unless a path is configured.
#[derive(Debug, Default)]
pub struct DumpDebugContainerPass {
    path: Option<PathBuf>,
}

impl DumpDebugContainerPass {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl CompilerPass for DumpDebugContainerPass {
    fn name(&self) -> &'static str {
        "DumpDebugContainerPass"
    }

    fn process(&mut self, container: &mut ContainerBuilder) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let dump = Dumper::new(container).with_log(true).dump(DumpFormat::Json)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, dump)?;

        info!("Wrote debug container to {}", path.display());
        container.log(self.name(), format!("wrote {}", path.display()));
        Ok(())
    }
}
