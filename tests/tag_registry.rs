// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Tag resolution: built-in handlers, unknown numbers and caller-supplied
//! handlers.

use cbor_object::{
    CborError, CborObject, Decoder, SliceReader, Tag, TagHandler, TagRegistry, Value, from_slice,
    to_vec,
};
use hex_literal::hex;
use std::sync::Arc;
use std::thread;

#[test]
fn test_unknown_tag_keeps_number_and_child() {
    let data = hex!("d9 ea60 83 01 61 78 f6");
    let object = from_slice(&data).unwrap();
    let tag = object.as_tag().unwrap();
    assert_eq!(tag.number(), 60000);
    assert_eq!(tag.handler_name(), "generic");
    assert_eq!(
        tag.child(),
        &CborObject::array(vec![
            CborObject::unsigned(1),
            CborObject::text("x"),
            CborObject::null(),
        ])
    );
    assert_eq!(to_vec(&object), data);
    assert_eq!(object.normalize(false), tag.child().normalize(false));
}

#[test]
fn test_tag_header_width_is_kept() {
    // Tag 2 written with an eight byte header
    let data = hex!("db 0000000000000002 42 0100");
    let object = from_slice(&data).unwrap();
    assert_eq!(object.as_tag().unwrap().number(), 2);
    assert_eq!(object.normalize(false), Value::Integer(256));
    assert_eq!(to_vec(&object), data);
}

#[test]
fn test_positive_big_integer() {
    let object = from_slice(&hex!("c2 42 0100")).unwrap();
    assert_eq!(object.normalize(false), Value::Integer(256));
    assert_eq!(object.normalize(true), Value::Bytes(vec![0x01, 0x00]));

    // Chunked byte strings are byte strings too
    let object = from_slice(&hex!("c2 5f 41 01 41 00 ff")).unwrap();
    assert_eq!(object.normalize(false), Value::Integer(256));

    assert!(matches!(
        Tag::positive_big_integer(CborObject::array(vec![])),
        Err(CborError::InvalidTagPayload { tag: 2, .. })
    ));
    assert!(matches!(
        from_slice(&hex!("c2 01")),
        Err(CborError::InvalidTagPayload { tag: 2, .. })
    ));
}

#[test]
fn test_built_tags_match_decoded_tags() {
    let cases = [
        CborObject::tag(0, CborObject::text("2013-03-21T20:04:00Z")).unwrap(),
        CborObject::tag(1, CborObject::float(1363896240.5)).unwrap(),
        CborObject::tag(2, CborObject::bytes(vec![0x01, 0x00])).unwrap(),
        CborObject::tag(3, CborObject::bytes(vec![0x01, 0x00])).unwrap(),
        CborObject::tag(32, CborObject::text("http://www.example.com")).unwrap(),
        CborObject::tag(55799, CborObject::array(vec![CborObject::unsigned(1)])).unwrap(),
        CborObject::tag(60000, CborObject::null()).unwrap(),
    ];
    for object in cases {
        let decoded = from_slice(&to_vec(&object)).unwrap();
        assert_eq!(decoded, object);
        assert_eq!(
            decoded.as_tag().unwrap().handler_name(),
            object.as_tag().unwrap().handler_name()
        );
        assert_eq!(decoded.normalize(false), object.normalize(false));
    }

    let built = CborObject::tag(2, CborObject::bytes(vec![0x01, 0x00])).unwrap();
    assert_eq!(built.normalize(false), Value::Integer(256));
}

#[test]
fn test_builtin_tag_rejects_wrong_child() {
    assert!(matches!(
        CborObject::tag(2, CborObject::text("x")),
        Err(CborError::InvalidTagPayload { tag: 2, .. })
    ));
    assert!(matches!(
        CborObject::tag(1, CborObject::text("now")),
        Err(CborError::InvalidTagPayload { tag: 1, .. })
    ));
    // Numbers without a built-in handler take any child
    assert!(CborObject::tag(4000, CborObject::text("x")).is_ok());
}

#[test]
fn test_tag_map_key_identity_is_build_independent() {
    let key = CborObject::tag(2, CborObject::bytes(vec![0x01, 0x00])).unwrap();
    let map = CborObject::map(vec![(key.clone(), CborObject::text("v"))]);
    let CborObject::Map(decoded) = from_slice(&to_vec(&map)).unwrap() else {
        panic!("expected a definite map");
    };
    assert_eq!(decoded.get(&key), Some(&CborObject::text("v")));
    // Same normalized key as the plain integer 256
    assert_eq!(decoded.get(&CborObject::unsigned(256)), Some(&CborObject::text("v")));
}

#[test]
fn test_nested_tags_and_ignore_tags() {
    // Self-described CBOR around a bignum
    let object = from_slice(&hex!("d9d9f7 c2 42 0100")).unwrap();
    assert_eq!(object.normalize(false), Value::Integer(256));
    assert_eq!(object.normalize(true), Value::Bytes(vec![0x01, 0x00]));

    // ignore_tags reaches tags inside containers
    let object = from_slice(&hex!("a1 61 6e c3 41 00")).unwrap();
    let value = object.normalize(true);
    assert_eq!(value.as_map().unwrap()[&Value::from("n")], Value::Bytes(vec![0]));
    let value = object.normalize(false);
    assert_eq!(value.as_map().unwrap()[&Value::from("n")], Value::Integer(-1));
}

#[test]
fn test_normalize_is_repeatable() {
    let object = from_slice(&hex!("a2 61 61 c2 42 0100 61 62 9f f5 f7 ff")).unwrap();
    let before = to_vec(&object);
    let first = object.normalize(false);
    let second = object.normalize(false);
    assert_eq!(first, second);
    assert_eq!(to_vec(&object), before);
}

/// Tag 37 (UUID) as a test-local extension.
#[derive(Debug)]
struct Uuid;

impl TagHandler for Uuid {
    fn name(&self) -> &'static str {
        "uuid"
    }

    fn validate(&self, number: u64, child: &CborObject) -> cbor_object::Result<()> {
        match child {
            CborObject::ByteString(b) if b.len() == 16 => Ok(()),
            _ => Err(CborError::InvalidTagPayload {
                tag: number,
                reason: "expected 16 bytes".to_string(),
            }),
        }
    }

    fn normalize(&self, child: &CborObject) -> Value {
        let bytes = child.normalize(false);
        let hex: String = bytes
            .as_bytes()
            .unwrap_or_default()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Value::Text(hex)
    }
}

#[test]
fn test_custom_handler() {
    let mut registry = TagRegistry::new();
    registry.register(37, Uuid);
    let decoder = Decoder::new().with_registry(registry);

    let mut data = hex!("d8 25 50").to_vec();
    data.extend(0u8..16);
    let object = decoder.decode(&mut SliceReader::new(&data)).unwrap();
    assert_eq!(object.as_tag().unwrap().handler_name(), "uuid");
    assert_eq!(
        object.normalize(false),
        Value::from("000102030405060708090a0b0c0d0e0f")
    );

    let short = hex!("d8 25 42 0102");
    assert!(matches!(
        decoder.decode(&mut SliceReader::new(&short)),
        Err(CborError::InvalidTagPayload { tag: 37, .. })
    ));
    // The default decoder does not know tag 37
    assert!(from_slice(&short).is_ok());
}

#[test]
fn test_replacing_a_builtin() {
    let mut registry = TagRegistry::new();
    let previous = registry.register(2, cbor_object::tags::GenericTag).unwrap();
    assert_eq!(previous.name(), "positive big integer");

    let decoder = Decoder::new().with_registry(registry);
    let data = hex!("c2 61 61");
    let object = decoder.decode(&mut SliceReader::new(&data)).unwrap();
    assert_eq!(object.normalize(false), Value::from("a"));
}

#[test]
fn test_shared_decoder_across_threads() {
    let mut registry = TagRegistry::new();
    registry.register(37, Uuid);
    let decoder = Arc::new(Decoder::new().with_registry(registry));

    let handles: Vec<_> = (0..4u64)
        .map(|i| {
            let decoder = Arc::clone(&decoder);
            thread::spawn(move || {
                let object = CborObject::array(vec![
                    Tag::big_integer(&(num_bigint::BigInt::from(i) << 70)).into(),
                    CborObject::tag(4000 + i, CborObject::unsigned(i)).unwrap(),
                ]);
                let bytes = to_vec(&object);
                let decoded = decoder.decode(&mut SliceReader::new(&bytes)).unwrap();
                assert_eq!(to_vec(&decoded), bytes);
                decoded.normalize(false)
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.join().unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items[0], Value::Integer((i as i128) << 70));
        assert_eq!(items[1], Value::Integer(i as i128));
    }
}
