/*
 * Created on Wed Sep 20 2023
 *
 * This file is part of lyskom-client, an async client library for the LysKOM Protocol A conferencing system.
 *
 * lyskom-client is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The RPC/async/error-code catalogue: a process-wide, read-only table
//! built once from literal declarations. Adding a call is a data change
//! here, never a change to the dispatcher — no macro crate generates this,
//! it's just a function run through a `OnceLock`.

use crate::schema::Schema;
use std::collections::HashMap;
use std::sync::OnceLock;

/// `{ number, request schema, response schema }`, looked up by RPC name.
pub struct RpcDescriptor {
    pub number: i32,
    pub request: Schema,
    pub response: Schema,
}

/// `{ name, schema }`, looked up by the async message number carried in a
/// `:<numParams> <msgNum>...` frame.
pub struct AsyncDescriptor {
    pub name: &'static str,
    pub schema: Schema,
}

pub struct Catalogue {
    rpcs_by_name: HashMap<&'static str, RpcDescriptor>,
    rpcs_by_number: HashMap<i32, &'static str>,
    asyncs: HashMap<i32, AsyncDescriptor>,
    error_names: HashMap<i32, &'static str>,
}

impl Catalogue {
    pub fn rpc(&self, name: &str) -> Option<&RpcDescriptor> {
        self.rpcs_by_name.get(name)
    }
    pub fn rpc_name_for_number(&self, number: i32) -> Option<&'static str> {
        self.rpcs_by_number.get(&number).copied()
    }
    pub fn async_event(&self, msg_num: i32) -> Option<&AsyncDescriptor> {
        self.asyncs.get(&msg_num)
    }
    pub fn error_name(&self, code: i32) -> &'static str {
        self.error_names.get(&code).copied().unwrap_or("unknown-error")
    }
}

static CATALOGUE: OnceLock<Catalogue> = OnceLock::new();

/// The global catalogue, built on first use.
pub fn catalogue() -> &'static Catalogue {
    CATALOGUE.get_or_init(build)
}

/// the aux-item structure shared by `createPerson`, `createConf`, and the
/// various `*-aux-items` calls
fn aux_item_schema() -> Schema {
    Schema::structure([
        ("tag", Schema::Int32),
        (
            "flags",
            Schema::bitstring(aux::FLAG_NAMES, aux::FLAGS_WIDTH),
        ),
        ("inheritLimit", Schema::Int32),
        ("data", Schema::HollerithString),
    ])
}

fn person_flags_schema() -> Schema {
    Schema::bitstring(person::FLAG_NAMES, person::FLAGS_WIDTH)
}

fn build() -> Catalogue {
    let mut rpcs_by_name = HashMap::new();
    let mut rpcs_by_number = HashMap::new();

    let mut add = |name: &'static str, number: i32, request: Schema, response: Schema| {
        rpcs_by_name.insert(
            name,
            RpcDescriptor {
                number,
                request,
                response,
            },
        );
        rpcs_by_number.insert(number, name);
    };

    add("logout", 1, Schema::Empty, Schema::Empty);

    add(
        "login",
        62,
        Schema::structure([
            ("person", Schema::Int32),
            ("passwd", Schema::HollerithString),
            ("invisible", Schema::Bool),
        ]),
        Schema::Empty,
    );

    add(
        "acceptAsync",
        80,
        Schema::structure([("requestList", Schema::array(Schema::Int32))]),
        Schema::Empty,
    );

    add(
        "createPerson",
        89,
        Schema::structure([
            ("name", Schema::HollerithString),
            ("passwd", Schema::HollerithString),
            ("flags", person_flags_schema()),
            ("auxItems", Schema::array(aux_item_schema())),
        ]),
        Schema::Int32, // newly created person number
    );

    add(
        "getPersonStat",
        49,
        Schema::structure([("person", Schema::Int32)]),
        Schema::structure([
            ("username", Schema::HollerithString),
            ("flags", person_flags_schema()),
            ("lastLogin", Schema::Int32),
        ]),
    );

    add(
        "sendMessage",
        53,
        Schema::structure([
            ("recipient", Schema::Int32),
            ("message", Schema::HollerithString),
        ]),
        Schema::Empty,
    );

    let mut asyncs = HashMap::new();
    asyncs.insert(
        12,
        AsyncDescriptor {
            name: "send-message",
            schema: Schema::structure([
                ("recipient", Schema::Int32),
                ("sender", Schema::Int32),
                ("message", Schema::HollerithString),
            ]),
        },
    );
    asyncs.insert(
        0,
        AsyncDescriptor {
            name: "new-name",
            schema: Schema::structure([
                ("confNo", Schema::Int32),
                ("oldName", Schema::HollerithString),
                ("newName", Schema::HollerithString),
            ]),
        },
    );
    asyncs.insert(
        5,
        AsyncDescriptor {
            name: "logout",
            schema: Schema::structure([("person", Schema::Int32), ("session", Schema::Int32)]),
        },
    );

    let mut error_names = HashMap::new();
    for (code, name) in error_code::TABLE {
        error_names.insert(*code, *name);
    }

    Catalogue {
        rpcs_by_name,
        rpcs_by_number,
        asyncs,
        error_names,
    }
}

/// `PersonalFlags`: an 8-bit flag word attached to a person record.
pub mod person {
    pub const FLAGS_WIDTH: u8 = 8;
    pub const FLAG_NAMES: [&str; 1] = ["unreadIsSecret"];
}

/// `AuxItemFlags`: an 8-bit flag word attached to one auxiliary item.
pub mod aux {
    pub const FLAGS_WIDTH: u8 = 8;
    pub const FLAG_NAMES: [&str; 2] = ["inherit", "dontGarb"];

    // well-known aux-item tags (a small, non-exhaustive sample; new ones
    // are just more constants, never a dispatcher change)
    pub const CONTENT_TYPE: i32 = 1;
    pub const FAST_REPLY: i32 = 2;
    pub const CROSS_REFERENCE: i32 = 3;
}

/// codes 0-61 as defined by LysKOM Protocol A
pub mod error_code {
    pub const TABLE: &[(i32, &str)] = &[
        (0, "no-error"),
        (1, "reserved"),
        (2, "not-implemented"),
        (3, "obsolete-call"),
        (4, "invalid-password"),
        (5, "string-too-long"),
        (6, "login-first"),
        (7, "login-disallowed"),
        (8, "conference-zero"),
        (9, "undefined-conference"),
        (10, "undefined-person"),
        (11, "access-denied"),
        (12, "permission-denied"),
        (13, "not-member"),
        (14, "no-such-text"),
        (15, "text-zero"),
        (16, "no-such-local-text"),
        (17, "local-text-zero"),
        (18, "bad-name"),
        (19, "index-out-of-range"),
        (20, "conference-exists"),
        (21, "person-exists"),
        (22, "secret-public"),
        (23, "letterbox"),
        (24, "ldb-error"),
        (25, "illegal-misc"),
        (26, "illegal-info-type"),
        (27, "already-recipient"),
        (28, "already-comment"),
        (29, "already-footnote"),
        (30, "already-crossref"),
        (31, "not-recipient"),
        (32, "not-comment"),
        (33, "not-footnote"),
        (34, "recipient-limit"),
        (35, "comment-limit"),
        (36, "footnote-limit"),
        (37, "mark-limit"),
        (38, "not-author"),
        (39, "no-connect"),
        (40, "out-of-memory"),
        (41, "server-is-crazy"),
        (42, "client-is-crazy"),
        (43, "undefined-session"),
        (44, "regexp-error"),
        (45, "not-marked"),
        (46, "temporary-failure"),
        (47, "long-array"),
        (48, "anonymous-rejected"),
        (49, "illegal-aux-item"),
        (50, "aux-item-permission"),
        (51, "unknown-async"),
        (52, "internal-error"),
        (53, "feature-disabled"),
        (54, "message-not-sent"),
        (55, "invalid-membership-type"),
        (56, "invalid-range"),
        (57, "invalid-range-list"),
        (58, "undefined-measurement"),
        (59, "priority-denied"),
        (60, "weight-denied"),
        (61, "weight-zero"),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logout_descriptor() {
        let cat = catalogue();
        let d = cat.rpc("logout").unwrap();
        assert_eq!(d.number, 1);
        assert_eq!(cat.rpc_name_for_number(1), Some("logout"));
    }

    #[test]
    fn create_person_descriptor_matches_flag_widths() {
        let cat = catalogue();
        let d = cat.rpc("createPerson").unwrap();
        assert_eq!(d.number, 89);
    }

    #[test]
    fn async_send_message_is_registered() {
        let cat = catalogue();
        assert_eq!(cat.async_event(12).unwrap().name, "send-message");
    }

    #[test]
    fn error_code_lookup() {
        let cat = catalogue();
        assert_eq!(cat.error_name(10), "undefined-person");
        assert_eq!(cat.error_name(9999), "unknown-error");
    }

    #[test]
    fn error_code_table_is_contiguous_0_to_61() {
        for (i, (code, _)) in error_code::TABLE.iter().enumerate() {
            assert_eq!(*code, i as i32, "gap or reorder at index {i}");
        }
        assert_eq!(error_code::TABLE.len(), 62);
    }

    #[test]
    fn unknown_rpc_name_is_none() {
        assert!(catalogue().rpc("not-a-real-rpc").is_none());
    }
}
