//! Parameter codec properties over generated values.
//!
//! # Design
//! `decode(encode(v)) == v` must hold field for field for every flat shape
//! the codec accepts. Floats are restricted to finite values since `NaN`
//! never compares equal to itself.

use proptest::prelude::*;
use route_core::params::{decode, encode};
use route_core::template::resolve;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Role {
    Admin,
    Editor,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Filter {
    name: String,
    page: u32,
    offset: i64,
    ratio: f64,
    active: bool,
    initial: char,
    role: Role,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    roles: Vec<Role>,
    limit: Option<u16>,
    owner: Option<Uuid>,
}

fn role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Admin), Just(Role::Editor), Just(Role::Viewer)]
}

prop_compose! {
    fn filter()(
        name in ".*",
        page in any::<u32>(),
        offset in any::<i64>(),
        ratio in -1.0e9f64..1.0e9,
        active in any::<bool>(),
        initial in any::<char>(),
        role in role(),
        tags in prop::collection::vec(".*", 0..5),
        roles in prop::collection::vec(role(), 0..4),
        limit in prop::option::of(any::<u16>()),
        owner in prop::option::of(any::<u128>().prop_map(Uuid::from_u128)),
    ) -> Filter {
        Filter { name, page, offset, ratio, active, initial, role, tags, roles, limit, owner }
    }
}

proptest! {
    #[test]
    fn decode_inverts_encode(value in filter()) {
        let map = encode(&value).unwrap();
        let back: Filter = decode(&map).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn list_fields_keep_every_member_in_order(tags in prop::collection::vec("[a-z]{1,8}", 1..6)) {
        let value = Filter {
            name: String::new(),
            page: 0,
            offset: 0,
            ratio: 0.0,
            active: false,
            initial: 'a',
            role: Role::Viewer,
            tags: tags.clone(),
            roles: Vec::new(),
            limit: None,
            owner: None,
        };
        let map = encode(&value).unwrap();
        prop_assert_eq!(map.get("tags").unwrap(), tags.as_slice());
        prop_assert!(map.get("roles").is_none());
        prop_assert!(map.get("limit").is_none());
    }

    #[test]
    fn query_string_preserves_the_map(value in filter()) {
        let map = encode(&value).unwrap();
        let reparsed = route_core::ParameterMap::from_query(&map.to_query_string());
        let back: Filter = decode(&reparsed).unwrap();
        prop_assert_eq!(back, value);
    }

    #[test]
    fn path_values_land_in_their_placeholders(id in any::<u64>(), slug in "[a-z0-9-]{1,16}") {
        #[derive(Serialize)]
        struct PostPath {
            id: u64,
            slug: String,
        }
        let url = resolve("/posts/{id}/{slug}", &PostPath { id, slug: slug.clone() }).unwrap();
        prop_assert_eq!(url, format!("/posts/{id}/{slug}"));
    }
}

#[test]
fn enum_members_use_declared_names() {
    #[derive(Serialize)]
    struct Roles {
        roles: Vec<Role>,
    }
    let map = encode(&Roles {
        roles: vec![Role::Viewer, Role::Admin, Role::Editor],
    })
    .unwrap();
    assert_eq!(map.get("roles").unwrap(), ["viewer", "admin", "editor"]);
}

#[test]
fn uuid_fields_decode_from_hyphenated_text() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct UserPath {
        id: Uuid,
    }
    let id = Uuid::new_v4();
    let map: route_core::ParameterMap = [("id", id.to_string())].into_iter().collect();
    assert_eq!(decode::<UserPath>(&map).unwrap(), UserPath { id });
}
