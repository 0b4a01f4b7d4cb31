use crate::model::{EntityKind, Handle};
use crate::repository::{CatalogEntity, EntityRepository};

pub type HandleRepository = EntityRepository<Handle>;

impl CatalogEntity for Handle {
    const KIND: EntityKind = EntityKind::Handle;
    const COLUMNS: &'static [&'static str] = &["modelo", "medida", "fabricante", "cor", "foto"];

    fn fallback() -> Vec<Self> {
        [
            ("demo-puxador-1", "Puxador Slim", "300mm", "Alumax", "Preto"),
            ("demo-puxador-2", "Puxador Concha", "150mm", "Alumax", "Inox"),
            ("demo-puxador-3", "Puxador Perfil", "1000mm", "Vitrum", "Branco"),
        ]
        .into_iter()
        .map(|(id, model, size, manufacturer, color)| Handle {
            id: Some(id.to_string()),
            model: model.to_string(),
            size: size.to_string(),
            manufacturer: Some(manufacturer.to_string()),
            color: Some(color.to_string()),
            photo_ref: None,
            owner_id: None,
            created_at: None,
        })
        .collect()
    }
}
