//! H2.
//!
//! Stored procedures in H2 are Java aliases, which dbmap does not manage.

use dbmap_core::{PrimaryColumn, TypeSerializer};
use dbmap_query::Escape;

use crate::{Dialect, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct H2;

impl Escape for H2 {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '"', '"')
    }
}

impl Dialect for H2 {
    fn name(&self) -> &'static str {
        "h2"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::h2()
    }

    fn allows_auto_uuid(&self) -> bool {
        true
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        let name = self.escape(&primary.column.name);
        let db_type = primary.column.db_type();
        if primary.auto_increment {
            format!("{name} {db_type} AUTO_INCREMENT PRIMARY KEY")
        } else if primary.auto_uuid {
            format!("{name} {db_type} PRIMARY KEY DEFAULT RANDOM_UUID()")
        } else {
            common::manual_primary_key(self, primary)
        }
    }

    fn supports_cascade_update(&self) -> bool {
        false
    }
}
