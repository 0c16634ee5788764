//! Fixtures shared by the unit tests.

use docvault_ledger::RevisionInput;
use docvault_types::{Clock, DocumentId, ManualClock, UserId};

use crate::document::Document;
use crate::variant::{SchemaFields, SchemaVariant};

pub(crate) const ORDER_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="order">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
      </xs:sequence>
      <xs:attribute name="id" type="xs:positiveInteger" use="required"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

/// Accepts `<order>` with an optional `<note>` after the items.
pub(crate) const ORDER_XSD_WITH_NOTE: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="order">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="item" type="xs:string" maxOccurs="unbounded"/>
        <xs:element name="note" type="xs:string" minOccurs="0"/>
      </xs:sequence>
      <xs:attribute name="id" type="xs:positiveInteger" use="required"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

pub(crate) fn order(id: u32, items: &[&str]) -> String {
    let items: String = items.iter().map(|i| format!("<item>{i}</item>")).collect();
    format!(r#"<order id="{id}">{items}</order>"#)
}

pub(crate) fn schema_doc(owner: &str, content: &str) -> Document<SchemaVariant> {
    let now = ManualClock::default().now();
    Document {
        id: DocumentId::new(),
        name: "fixture".into(),
        description: String::new(),
        content: content.as_bytes().to_vec(),
        version: 1,
        based_on: None,
        owner: UserId::new(owner),
        created_at: now,
        updated_at: now,
        deleted_at: None,
        fields: SchemaFields {},
    }
}

/// The revision input a content change to `doc` would record.
pub(crate) fn outgoing(doc: &Document<SchemaVariant>) -> RevisionInput {
    RevisionInput {
        document: doc.id,
        content: doc.content.clone(),
        snapshot_created_at: doc.created_at,
        snapshot_updated_at: doc.updated_at,
        by_user: doc.owner.clone(),
        recorded_at: doc.updated_at,
    }
}
