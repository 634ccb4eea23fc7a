#![allow(dead_code)]

use std::sync::Arc;

use tastemark_app::{AdminService, CatalogService, ChatBoard, InMemoryBackend};
use tastemark_auth::{AuthContext, Caller};
use tastemark_catalog::{ImageUpload, ProductDraft};
use tastemark_core::{Email, ProductId, UserId};
use tastemark_infra::{AdminDirectory, InMemoryDocumentStore, InMemoryObjectStore, TastemarkConfig};

pub type Store = Arc<InMemoryDocumentStore>;
pub type Objects = Arc<InMemoryObjectStore>;
pub type Directory = Arc<AdminDirectory<Store>>;

pub const ADMIN_EMAIL: &str = "admin@tastemark.test";

/// A fully wired in-memory site with one bootstrapped admin.
pub struct Site {
    pub config: TastemarkConfig,
    pub backend: InMemoryBackend,
    pub catalog: CatalogService<Store, Objects, Directory>,
    pub chat: ChatBoard<Store, Objects, Directory>,
    pub admins: AdminService<Store, Directory>,
    pub admin: Caller,
}

impl Site {
    pub fn new() -> Self {
        Self::with_config(TastemarkConfig {
            bootstrap_admins: vec![Email::parse(ADMIN_EMAIL).unwrap()],
            ..TastemarkConfig::default()
        })
    }

    pub fn with_config(config: TastemarkConfig) -> Self {
        tastemark_observability::init();
        let backend = InMemoryBackend::in_memory(&config).unwrap();
        Self {
            catalog: CatalogService::new(backend.clone()),
            chat: ChatBoard::new(backend.clone()),
            admins: AdminService::new(AdminDirectory::new(Arc::clone(&backend.store)), Arc::clone(&backend.admins)),
            admin: user(ADMIN_EMAIL),
            backend,
            config,
        }
    }

    pub fn store(&self) -> &InMemoryDocumentStore {
        &self.backend.store
    }

    pub fn objects(&self) -> &InMemoryObjectStore {
        &self.backend.objects
    }

    /// Submit and approve a product in one go.
    pub fn approved_product(&self, name: &str, category: &str) -> ProductId {
        let id = self
            .catalog
            .submit_product(&user("maker@tastemark.test"), &draft(name, category), vec![jpeg()])
            .unwrap();
        self.catalog.gate().approve::<tastemark_catalog::Product>(&self.admin, &id).unwrap();
        id
    }
}

pub fn user(email: &str) -> Caller {
    Caller::user(AuthContext::new(UserId::new(), Email::parse(email).unwrap()))
}

pub fn draft(name: &str, category: &str) -> ProductDraft {
    ProductDraft {
        name: name.to_string(),
        category: category.to_string(),
        description: format!("{name} from the test kitchen"),
    }
}

pub fn jpeg() -> ImageUpload {
    ImageUpload::new("photo.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff, 0xe0])
}
