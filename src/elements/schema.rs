//! Static per-type field schemas
//!
//! A schema names exactly the fields submitted for an element type and the
//! default used when neither the pending change nor the baseline supplies a
//! value. Diameters, spacings and covers are in millimetres.

use serde_json::Value;

/// One submitted field and its fallback value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub default: i64,
}

const fn field(name: &'static str, default: i64) -> FieldSpec {
    FieldSpec { name, default }
}

/// Fixed set of fields submitted for one element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSchema {
    fields: &'static [FieldSpec],
}

impl FieldSchema {
    pub const PIER: FieldSchema = FieldSchema {
        fields: &[
            field("nMeshes", 2),
            field("diameterV", 8),
            field("spacingV", 200),
            field("diameterH", 8),
            field("spacingH", 200),
            field("nEdgeBars", 2),
            field("diameterEdge", 12),
            field("stirrupDiameter", 8),
            field("stirrupSpacing", 150),
            field("cover", 25),
        ],
    };

    pub const COLUMN: FieldSchema = FieldSchema {
        fields: &[
            field("nBarsDepth", 3),
            field("nBarsWidth", 3),
            field("diameter", 16),
            field("stirrupDiameter", 10),
            field("stirrupSpacing", 150),
            field("stirrupLegsDepth", 2),
            field("stirrupLegsWidth", 2),
            field("cover", 40),
        ],
    };

    /// 1x1 bar grid, no stirrups
    pub const STRUT: FieldSchema = FieldSchema {
        fields: &[
            field("nBarsDepth", 1),
            field("nBarsWidth", 1),
            field("diameter", 12),
        ],
    };

    pub const BEAM: FieldSchema = FieldSchema {
        fields: &[
            field("nBarsTop", 3),
            field("nBarsBottom", 3),
            field("diameterTop", 16),
            field("diameterBottom", 16),
            field("stirrupDiameter", 10),
            field("stirrupSpacing", 150),
            field("nStirrupLegs", 2),
        ],
    };

    pub const DROP_BEAM: FieldSchema = FieldSchema {
        fields: &[
            field("nBarsTop", 3),
            field("nBarsBottom", 3),
            field("diameterTop", 16),
            field("diameterBottom", 16),
            field("diameterLateral", 10),
            field("nLateralBars", 0),
            field("stirrupDiameter", 10),
            field("stirrupSpacing", 150),
            field("nStirrupLegs", 2),
        ],
    };

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn default_for(&self, name: &str) -> Option<Value> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| Value::from(f.default))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementType;

    #[test]
    fn test_cover_defaults() {
        assert_eq!(ElementType::Pier.schema().default_for("cover"), Some(Value::from(25)));
        assert_eq!(ElementType::Column.schema().default_for("cover"), Some(Value::from(40)));
        assert!(!ElementType::Strut.schema().contains("cover"));
    }

    #[test]
    fn test_strut_schema_is_single_bar_without_stirrups() {
        let schema = ElementType::Strut.schema();
        assert_eq!(schema.default_for("nBarsDepth"), Some(Value::from(1)));
        assert_eq!(schema.default_for("nBarsWidth"), Some(Value::from(1)));
        assert!(schema.fields().iter().all(|f| !f.name.starts_with("stirrup")));
    }

    #[test]
    fn test_field_names_unique_per_schema() {
        for ty in ElementType::ALL {
            let schema = ty.schema();
            for (i, a) in schema.fields().iter().enumerate() {
                for b in &schema.fields()[i + 1..] {
                    assert_ne!(a.name, b.name, "duplicate field in {ty} schema");
                }
            }
        }
    }
}
