use crate::logic::color_spec::{self, DEFAULT_GLASS_COLOR};
use crate::model::{EntityKind, Glass};
use crate::repository::{CatalogEntity, EntityRepository};
use crate::store::ListQuery;

pub type GlassRepository = EntityRepository<Glass>;

impl CatalogEntity for Glass {
    const KIND: EntityKind = EntityKind::Glass;
    const COLUMNS: &'static [&'static str] = &["tipo", "rgb"];

    fn fallback() -> Vec<Self> {
        [
            ("demo-vidro-1", "Bronze", "205,127,50,0.4"),
            ("demo-vidro-2", "Fumê", "80,80,80,0.5"),
            ("demo-vidro-3", "Incolor", DEFAULT_GLASS_COLOR),
            ("demo-vidro-4", "Verde", "0,160,80,0.35"),
        ]
        .into_iter()
        .map(|(id, glass_type, rgb)| Glass {
            id: Some(id.to_string()),
            glass_type: glass_type.to_string(),
            color_spec: Some(rgb.to_string()),
            active: true,
            created_at: None,
        })
        .collect()
    }

    /// Deactivated glass types stay in the table but are never listed
    fn list_query() -> ListQuery {
        ListQuery::new().eq("ativo", "true").order_by(Self::KIND.natural_key())
    }

    fn defaults() -> &'static [(&'static str, &'static str)] {
        &[("rgb", DEFAULT_GLASS_COLOR)]
    }

    fn normalize_column(column: &str, value: &str) -> String {
        match column {
            "rgb" => color_spec::normalize(value).unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        }
    }
}
