#![allow(dead_code)]

use std::sync::Arc;

use eve_api::{HttpMethod, Item, MockTransport};
use serde_json::{Value, json};

pub const ROOT_URL: &str = "http://eve.test/api/";
pub const WIDGETS_URL: &str = "http://eve.test/api/widgets/";

pub fn item(value: Value) -> Item {
    value.as_object().cloned().expect("object literal")
}

/// Transport already answering the root document with a `widgets` link.
pub fn transport_with_root() -> Arc<MockTransport> {
    let transport = Arc::new(MockTransport::new());
    transport.respond(
        HttpMethod::Get,
        ROOT_URL,
        200,
        Some(json!({
            "_links": {
                "child": [
                    {"title": "widgets", "href": WIDGETS_URL},
                    {"title": "gadgets", "href": "http://eve.test/api/gadgets"}
                ]
            }
        })),
    );
    transport
}

pub fn persisted_widget() -> Item {
    item(json!({
        "_id": "42",
        "_etag": "etag-1",
        "_links": {"self": {"href": "http://eve.test/api/widgets/42", "title": "widget"}},
        "_created": "Mon, 01 Jan 2024 00:00:00 GMT",
        "_updated": "Mon, 01 Jan 2024 00:00:00 GMT",
        "name": "sprocket",
        "size": 3
    }))
}
