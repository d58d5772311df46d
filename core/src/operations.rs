//! Typed wrappers for the remote operations.
//!
//! Each wrapper only assembles the parameter mapping and forwards it through
//! `SugarClient::invoke`. The server binds `rest_data` entries by position,
//! so parameter order below is the order the server expects. Results are
//! returned undecoded.

use serde_json::{json, Value};

use crate::client::SugarClient;
use crate::error::ApiError;
use crate::transport::Connector;
use crate::types::parameters;

/// Options for `get_entry_list`.
#[derive(Debug, Clone, Default)]
pub struct EntryListQuery<'a> {
    pub query: Option<&'a str>,
    pub order_by: Option<&'a str>,
    pub offset: u32,
    pub select_fields: &'a [&'a str],
    pub link_name_to_fields: Value,
    pub max_results: Option<u32>,
    pub deleted: bool,
    pub favorites: bool,
}

/// Options for `search_by_module`.
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub offset: u32,
    pub max_results: Option<u32>,
    pub assigned_user_id: Option<&'a str>,
    pub select_fields: &'a [&'a str],
    pub unified_search_only: bool,
    pub favorites: bool,
}

impl Default for SearchQuery<'_> {
    fn default() -> Self {
        Self {
            offset: 0,
            max_results: None,
            assigned_user_id: None,
            select_fields: &[],
            unified_search_only: true,
            favorites: false,
        }
    }
}

/// Which layouts `get_module_layout` and `get_module_layout_md5` fetch.
#[derive(Debug, Clone)]
pub struct LayoutQuery<'a> {
    pub types: &'a [&'a str],
    pub views: &'a [&'a str],
    pub acl_check: bool,
}

impl Default for LayoutQuery<'_> {
    fn default() -> Self {
        Self {
            types: &["default"],
            views: &["detail"],
            acl_check: true,
        }
    }
}

/// Relationship selector for `get_relationships`.
#[derive(Debug, Clone, Default)]
pub struct RelationshipQuery<'a> {
    pub related_module_query: &'a str,
    pub related_fields: &'a [&'a str],
    pub related_module_link_name_to_fields: Value,
    pub deleted: bool,
    pub order_by: &'a str,
}

/// A note attachment for `set_note_attachment`.
#[derive(Debug, Clone, Default)]
pub struct NoteAttachment<'a> {
    pub id: &'a str,
    pub filename: &'a str,
    /// Base64-encoded file content.
    pub file: &'a str,
    pub related_module_id: &'a str,
    pub related_module_name: &'a str,
}

/// A document revision for `set_document_revision`.
#[derive(Debug, Clone, Default)]
pub struct DocumentRevision<'a> {
    pub id: &'a str,
    pub document_name: &'a str,
    pub revision: &'a str,
    pub filename: &'a str,
    /// Base64-encoded file content.
    pub file: &'a str,
}

fn link_fields(value: &Value) -> Value {
    if value.is_null() {
        json!([])
    } else {
        value.clone()
    }
}

impl<C: Connector> SugarClient<C> {
    pub fn get_server_info(&mut self) -> Result<Value, ApiError> {
        self.invoke_anonymous("get_server_info", parameters(json!({})))
    }

    pub fn get_user_id(&mut self) -> Result<Value, ApiError> {
        self.invoke("get_user_id", parameters(json!({})))
    }

    pub fn get_module_fields(&mut self, module_name: &str, fields: &[&str]) -> Result<Value, ApiError> {
        self.invoke(
            "get_module_fields",
            parameters(json!({"module_name": module_name, "fields": fields})),
        )
    }

    pub fn get_module_fields_md5(&mut self, module_name: &str) -> Result<Value, ApiError> {
        self.invoke(
            "get_module_fields_md5",
            parameters(json!({"module_name": module_name})),
        )
    }

    pub fn get_entry(
        &mut self,
        module_name: &str,
        id: &str,
        select_fields: &[&str],
        link_name_to_fields: &Value,
        track_view: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_entry",
            parameters(json!({
                "module_name": module_name,
                "id": id,
                "select_fields": select_fields,
                "link_name_to_fields_array": link_fields(link_name_to_fields),
                "track_view": track_view,
            })),
        )
    }

    pub fn get_entries(
        &mut self,
        module_name: &str,
        ids: &[&str],
        select_fields: &[&str],
        link_name_to_fields: &Value,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_entries",
            parameters(json!({
                "module_name": module_name,
                "ids": ids,
                "select_fields": select_fields,
                "link_name_to_fields_array": link_fields(link_name_to_fields),
            })),
        )
    }

    /// Primary listing call.
    pub fn get_entry_list(
        &mut self,
        module_name: &str,
        query: &EntryListQuery<'_>,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_entry_list",
            parameters(json!({
                "module_name": module_name,
                "query": query.query,
                "order_by": query.order_by,
                "offset": query.offset,
                "select_fields": query.select_fields,
                "link_name_to_fields_array": link_fields(&query.link_name_to_fields),
                "max_results": query.max_results,
                "deleted": query.deleted,
                "favorites": query.favorites,
            })),
        )
    }

    pub fn get_entries_count(
        &mut self,
        module_name: &str,
        query: &str,
        deleted: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_entries_count",
            parameters(json!({"module_name": module_name, "query": query, "deleted": deleted})),
        )
    }

    /// Create or update one record. `fields` is a `name_value_list`.
    pub fn set_entry(&mut self, module_name: &str, fields: Value, track_view: bool) -> Result<Value, ApiError> {
        self.invoke(
            "set_entry",
            parameters(json!({
                "module_name": module_name,
                "name_value_list": fields,
                "track_view": track_view,
            })),
        )
    }

    /// Create or update several records; one `name_value_list` per record.
    pub fn update_entries(&mut self, module_name: &str, records: Vec<Value>) -> Result<Value, ApiError> {
        self.invoke(
            "update_entries",
            parameters(json!({"module_name": module_name, "name_value_lists": records})),
        )
    }

    pub fn get_module_layout(
        &mut self,
        module_names: &[&str],
        layout: &LayoutQuery<'_>,
        md5: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_module_layout",
            parameters(json!({
                "a_module_names": module_names,
                "a_type": layout.types,
                "a_view": layout.views,
                "acl_check": layout.acl_check,
                "md5": md5,
            })),
        )
    }

    /// Same selection as `get_module_layout`, but the server names these
    /// parameters differently.
    pub fn get_module_layout_md5(
        &mut self,
        module_names: &[&str],
        layout: &LayoutQuery<'_>,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_module_layout_md5",
            parameters(json!({
                "module_name": module_names,
                "type": layout.types,
                "view": layout.views,
                "acl_check": layout.acl_check,
            })),
        )
    }

    /// At least one module must be named.
    pub fn search_by_module(
        &mut self,
        search_string: &str,
        module_names: &[&str],
        search: &SearchQuery<'_>,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "search_by_module",
            parameters(json!({
                "search_string": search_string,
                "modules": module_names,
                "offset": search.offset,
                "max_results": search.max_results,
                "assigned_user_id": search.assigned_user_id,
                "select_fields": search.select_fields,
                "unified_search_only": search.unified_search_only,
                "favorites": search.favorites,
            })),
        )
    }

    /// `filter` is one of `all`, `default` or `mobile`.
    pub fn get_available_modules(&mut self, filter: &str, module_names: &[&str]) -> Result<Value, ApiError> {
        self.invoke(
            "get_available_modules",
            parameters(json!({"filter": filter, "modules": module_names})),
        )
    }

    pub fn get_language_definition(&mut self, module_names: &[&str], md5: bool) -> Result<Value, ApiError> {
        self.invoke(
            "get_language_definition",
            parameters(json!({"modules": module_names, "MD5": md5})),
        )
    }

    /// Results depend on the order of `module_names`.
    pub fn get_last_viewed(&mut self, module_names: &[&str]) -> Result<Value, ApiError> {
        self.invoke(
            "get_last_viewed",
            parameters(json!({"module_names": module_names})),
        )
    }

    pub fn get_upcoming_activities(&mut self) -> Result<Value, ApiError> {
        self.invoke("get_upcoming_activities", parameters(json!({})))
    }

    pub fn get_relationships(
        &mut self,
        module_name: &str,
        module_id: &str,
        link_field_name: &str,
        related: &RelationshipQuery<'_>,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "get_relationships",
            parameters(json!({
                "module_name": module_name,
                "module_id": module_id,
                "link_field_name": link_field_name,
                "related_module_query": related.related_module_query,
                "related_fields": related.related_fields,
                "related_module_link_name_to_fields_array":
                    link_fields(&related.related_module_link_name_to_fields),
                "deleted": related.deleted,
                "order_by": related.order_by,
            })),
        )
    }

    pub fn set_relationship(
        &mut self,
        module_name: &str,
        module_id: &str,
        link_field_name: &str,
        related_ids: &[&str],
        fields: Value,
        delete: bool,
    ) -> Result<Value, ApiError> {
        self.invoke(
            "set_relationship",
            parameters(json!({
                "module_name": module_name,
                "module_id": module_id,
                "link_field_name": link_field_name,
                "related_ids": related_ids,
                "name_value_list": fields,
                "delete": u8::from(delete),
            })),
        )
    }

    /// Parallel arrays: entry `i` of every slice describes one relationship.
    pub fn set_relationships(
        &mut self,
        module_names: &[&str],
        module_ids: &[&str],
        link_field_names: &[&str],
        related_ids: &[Vec<&str>],
        fields: Vec<Value>,
        delete: &[bool],
    ) -> Result<Value, ApiError> {
        let delete: Vec<u8> = delete.iter().copied().map(u8::from).collect();
        self.invoke(
            "set_relationships",
            parameters(json!({
                "module_names": module_names,
                "module_ids": module_ids,
                "link_field_names": link_field_names,
                "related_ids": related_ids,
                "name_value_lists": fields,
                "delete_array": delete,
            })),
        )
    }

    pub fn set_note_attachment(&mut self, note: &NoteAttachment<'_>) -> Result<Value, ApiError> {
        self.invoke(
            "set_note_attachment",
            parameters(json!({
                "note": {
                    "id": note.id,
                    "filename": note.filename,
                    "file": note.file,
                    "related_module_id": note.related_module_id,
                    "related_module_name": note.related_module_name,
                }
            })),
        )
    }

    pub fn get_note_attachment(&mut self, id: &str) -> Result<Value, ApiError> {
        self.invoke("get_note_attachment", parameters(json!({"id": id})))
    }

    pub fn set_document_revision(&mut self, revision: &DocumentRevision<'_>) -> Result<Value, ApiError> {
        self.invoke(
            "set_document_revision",
            parameters(json!({
                "document_revision": {
                    "id": revision.id,
                    "document_name": revision.document_name,
                    "revision": revision.revision,
                    "filename": revision.filename,
                    "file": revision.file,
                }
            })),
        )
    }

    pub fn get_document_revision(&mut self, id: &str) -> Result<Value, ApiError> {
        self.invoke("get_document_revision", parameters(json!({"id": id})))
    }

    /// Report mail-merge targets for campaign tracking.
    pub fn set_campaign_merge(&mut self, targets: &[&str], campaign_id: &str) -> Result<Value, ApiError> {
        self.invoke(
            "set_campaign_merge",
            parameters(json!({"targets": targets, "campaign_id": campaign_id})),
        )
    }

    pub fn seamless_login(&mut self) -> Result<Value, ApiError> {
        self.invoke("seamless_login", parameters(json!({})))
    }

    pub fn oauth_request_token(&mut self) -> Result<Value, ApiError> {
        self.invoke_anonymous("oauth_request_token", parameters(json!({})))
    }

    pub fn oauth_access(&mut self) -> Result<Value, ApiError> {
        self.invoke("oauth_access", parameters(json!({})))
    }

    pub fn job_queue_next(&mut self, client_id: &str) -> Result<Value, ApiError> {
        self.invoke("job_queue_next", parameters(json!({"clientid": client_id})))
    }

    pub fn job_queue_cycle(&mut self, client_id: &str) -> Result<Value, ApiError> {
        self.invoke("job_queue_cycle", parameters(json!({"clientid": client_id})))
    }

    pub fn job_queue_run(&mut self, job_id: &str, client_id: &str) -> Result<Value, ApiError> {
        self.invoke(
            "job_queue_run",
            parameters(json!({"jobid": job_id, "clientid": client_id})),
        )
    }
}
