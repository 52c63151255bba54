//! Application assembly.
//!
//! Builds the storage service, handler table, menu resource and pipeline
//! from parsed configuration. Every binary goes through here.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::auth::{AdminStore, SshKeyStore};
use crate::config::Args;
use crate::handlers::MenuHandlers;
use crate::menu;
use crate::pipeline::Pipeline;
use crate::session::SimpleStorageProvider;
use crate::store::{Db, StorageService, StoreSlot, UserStore};
use crate::types::Result;

/// File name of the SSH authorized-keys store inside the state directory.
pub const SSH_KEYS_FILE: &str = "ssh_authorized_keys.db";

pub struct App {
    pub args: Args,
    pub pipeline: Arc<Pipeline>,
    pub service: Arc<StorageService>,
    pub started_at: Instant,
}

impl App {
    pub async fn build(args: Args) -> Result<Self> {
        args.validate()?;
        let service = Arc::new(StorageService::new(args.conns()?));

        // Resource tier: menu nodes from code, templates overridable from
        // the resource directory and the optional translation directory.
        let resource_store = service.get(StoreSlot::Resource).await?;
        load_templates(&resource_store, &args.resourcedir).await;
        if let Some(gettext) = &args.gettext {
            load_templates(&resource_store, gettext).await;
        }
        let resource = Arc::new(menu::build().with_overrides(resource_store));

        let admin = match &args.admin_seed {
            Some(path) => Arc::new(AdminStore::load(path).await?),
            None => Arc::new(AdminStore::new()),
        };
        let api = ApiClient::new(args.api_config())?;
        let user = UserStore::new(service.get(StoreSlot::User).await?);
        let handlers = Arc::new(MenuHandlers::new(
            user,
            api,
            admin,
            args.language_codes(),
        ));

        let provider = Arc::new(SimpleStorageProvider::new(Arc::clone(&service)));
        let pipeline = Arc::new(Pipeline::new(provider, resource, handlers));

        Ok(Self {
            args,
            pipeline,
            service,
            started_at: Instant::now(),
        })
    }

    /// The SSH authorized-keys store, alongside the user store.
    pub async fn ssh_keys(&self) -> Result<SshKeyStore> {
        Ok(SshKeyStore::new(self.service.auxiliary(SSH_KEYS_FILE).await?))
    }

    pub async fn close(&self) -> Result<()> {
        self.service.close().await
    }
}

/// Load template files into the resource store; the file name is the
/// template key (`<sym>` or `<sym>_<lang>`). A missing directory is fine.
async fn load_templates(store: &Arc<dyn Db>, dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(_) => return,
    };
    let mut count = 0usize;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match tokio::fs::read(&path).await {
            Ok(contents) => {
                if let Err(e) = store.put(name.as_bytes(), &contents).await {
                    warn!(template = %name, error = %e, "template load failed");
                } else {
                    count += 1;
                }
            }
            Err(e) => warn!(template = %name, error = %e, "template read failed"),
        }
    }
    if count > 0 {
        info!(dir = %dir.display(), count, "menu templates loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_build_with_memory_stores() {
        let args = Args::try_parse_from(["mlango", "--db", "mem"]).unwrap();
        let app = App::build(args).await.unwrap();
        let (output, continues) = app
            .pipeline
            .run(app.args.engine_config("+254712345678"), "")
            .await
            .unwrap();
        assert!(output.contains("terms and conditions"));
        assert!(continues);
        app.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_template_dir_overrides() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("terms"), b"custom terms\n1:Yes\n2:No")
            .await
            .unwrap();
        let args = Args::try_parse_from([
            "mlango",
            "--db",
            "mem",
            "--resourcedir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let app = App::build(args).await.unwrap();
        let (output, _) = app
            .pipeline
            .run(app.args.engine_config("s1"), "")
            .await
            .unwrap();
        assert_eq!(output, "custom terms\n1:Yes\n2:No");
    }
}
