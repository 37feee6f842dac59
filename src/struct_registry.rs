//! Process-wide struct layout table.
//!
//! Dense layout (no alignment padding): `int`/`ptr` members are 8 bytes,
//! `char` is 1 byte, a nested struct member is the nested struct's own
//! size. Append-only during parsing; consulted by the parser (declaration
//! types) and codegen (member offsets, `sizeof`).

use crate::ast::{StructDef, TypeName};

#[derive(Debug, Default)]
pub struct StructRegistry {
    defs: Vec<StructDef>,
}

impl StructRegistry {
    pub fn new() -> Self {
        StructRegistry::default()
    }

    pub fn insert(&mut self, def: StructDef) {
        self.defs.push(def);
    }

    pub fn into_defs(self) -> Vec<StructDef> {
        self.defs
    }

    /// Rebuild a lookup table from a parsed program's flat struct list.
    /// Codegen runs after parsing has already drained the parser's own
    /// registry into `Program::structs`, so it needs its own handle.
    pub fn from_defs(defs: Vec<StructDef>) -> Self {
        StructRegistry { defs }
    }

    pub fn get(&self, name: &str) -> Option<&StructDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Byte width of a type name: 8 for `int`/`ptr`, 1 for `char`, the
    /// struct's own size for a struct name (must already be registered).
    pub fn size_of(&self, ty: &TypeName) -> i64 {
        match ty {
            TypeName::Int | TypeName::Ptr => 8,
            TypeName::Char => 1,
            TypeName::Struct(name) => self.total_size(name).unwrap_or(0),
        }
    }

    /// Offset and byte width of `field` within `struct_name`.
    pub fn member_offset(&self, struct_name: &str, field: &str) -> Option<(i64, i64)> {
        let def = self.get(struct_name)?;
        let mut offset = 0i64;
        for m in &def.members {
            let width = self.size_of(&m.ty);
            if m.name == field {
                return Some((offset, width));
            }
            offset += width;
        }
        None
    }

    pub fn total_size(&self, struct_name: &str) -> Option<i64> {
        let def = self.get(struct_name)?;
        Some(def.members.iter().map(|m| self.size_of(&m.ty)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StructMember;

    #[test]
    fn offsets_are_strictly_increasing_and_dense() {
        let mut reg = StructRegistry::new();
        reg.insert(StructDef {
            name: "P".into(),
            members: vec![
                StructMember { name: "x".into(), ty: TypeName::Int },
                StructMember { name: "y".into(), ty: TypeName::Char },
            ],
        });
        assert_eq!(reg.member_offset("P", "x"), Some((0, 8)));
        assert_eq!(reg.member_offset("P", "y"), Some((8, 1)));
        assert_eq!(reg.total_size("P"), Some(9));
    }

    #[test]
    fn nested_struct_member_takes_its_own_size() {
        let mut reg = StructRegistry::new();
        reg.insert(StructDef {
            name: "Inner".into(),
            members: vec![StructMember { name: "a".into(), ty: TypeName::Char }],
        });
        reg.insert(StructDef {
            name: "Outer".into(),
            members: vec![
                StructMember { name: "i".into(), ty: TypeName::Struct("Inner".into()) },
                StructMember { name: "n".into(), ty: TypeName::Int },
            ],
        });
        assert_eq!(reg.member_offset("Outer", "n"), Some((1, 8)));
        assert_eq!(reg.total_size("Outer"), Some(9));
    }

    #[test]
    fn size_of_struct_type_matches_total_size_for_nested_members() {
        let mut reg = StructRegistry::new();
        reg.insert(StructDef {
            name: "Inner".into(),
            members: vec![
                StructMember { name: "a".into(), ty: TypeName::Char },
                StructMember { name: "b".into(), ty: TypeName::Int },
            ],
        });
        reg.insert(StructDef {
            name: "Outer".into(),
            members: vec![StructMember { name: "i".into(), ty: TypeName::Struct("Inner".into()) }],
        });
        assert_eq!(reg.size_of(&TypeName::Struct("Outer".into())), 9);
        assert_eq!(reg.size_of(&TypeName::Struct("Outer".into())), reg.total_size("Outer").unwrap());
    }
}
