use crate::model::{EntityKind, Rail};
use crate::repository::{CatalogEntity, EntityRepository};

pub type RailRepository = EntityRepository<Rail>;

impl CatalogEntity for Rail {
    const KIND: EntityKind = EntityKind::Rail;
    const COLUMNS: &'static [&'static str] = &["nome", "tipo", "fabricante", "cor", "foto"];

    fn fallback() -> Vec<Self> {
        [
            ("demo-trilho-1", "Trilho Box", "Sobrepor", "Cinza"),
            ("demo-trilho-2", "Trilho Embutido", "Embutir", "Preto"),
            ("demo-trilho-3", "Trilho Superior", "Sobrepor", "Branco"),
        ]
        .into_iter()
        .map(|(id, name, mounting, color)| Rail {
            id: Some(id.to_string()),
            name: name.to_string(),
            mounting: Some(mounting.to_string()),
            manufacturer: None,
            color: Some(color.to_string()),
            photo_ref: None,
            owner_id: None,
            created_at: None,
        })
        .collect()
    }
}
