//! User CRUD operations
//!
//! Passwords arrive here already hashed; the raw password never reaches the
//! database layer and the hash is never serialized.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::nullable;
use crate::db::{reject_if_referenced, require_row, require_text};
use crate::types::HortaError;

/// User row from database
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    #[serde(rename = "id_usuario")]
    pub id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "id_grupo")]
    pub group_id: i64,
    #[serde(skip)]
    pub password_hash: String,
}

/// Signup payload
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,
    #[serde(rename = "id_grupo")]
    pub group_id: i64,
    #[serde(rename = "senha")]
    pub password: String,
}

/// Partial profile update; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    #[serde(rename = "nome", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "telefone", default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
    #[serde(rename = "id_grupo", default)]
    pub group_id: Option<i64>,
    #[serde(rename = "senha", default)]
    pub password: Option<String>,
}

const SELECT_USER: &str =
    "SELECT id_usuario, nome, email, telefone, id_grupo, senha FROM usuarios";

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        group_id: row.get(4)?,
        password_hash: row.get(5)?,
    })
}

fn validate_email(email: &str) -> Result<(), HortaError> {
    require_text(email, "email")?;
    if !email.contains('@') {
        return Err(HortaError::BadRequest(format!("Invalid email: {}", email)));
    }
    Ok(())
}

/// Get a user by ID
pub fn get_user(conn: &Connection, id: &str) -> Result<Option<UserRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE id_usuario = ?", SELECT_USER),
        params![id],
        map_user,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to get user: {}", e)))
}

/// Find a user by email (login and token subject lookup)
pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>, HortaError> {
    conn.query_row(
        &format!("{} WHERE email = ?", SELECT_USER),
        params![email],
        map_user,
    )
    .optional()
    .map_err(|e| HortaError::Database(format!("Failed to find user: {}", e)))
}

/// List all users
pub fn list_users(conn: &Connection) -> Result<Vec<UserRow>, HortaError> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY nome", SELECT_USER))?;
    let rows = stmt.query_map([], map_user)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| HortaError::Database(format!("Failed to list users: {}", e)))
}

/// Create a user with a generated UUID
///
/// Rejects an already-registered email (BadRequest) and an unknown group
/// (NotFound).
pub fn create_user(
    conn: &mut Connection,
    input: CreateUserInput,
    password_hash: String,
) -> Result<UserRow, HortaError> {
    require_text(&input.name, "nome")?;
    validate_email(&input.email)?;

    let tx = conn.transaction()?;

    if find_user_by_email(&tx, &input.email)?.is_some() {
        return Err(HortaError::BadRequest("Email already registered".to_string()));
    }
    require_row(&tx, "grupos_usuarios", "id_grupo", &input.group_id, "Group")?;

    let id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO usuarios (id_usuario, id_grupo, nome, email, telefone, senha)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            id,
            input.group_id,
            input.name,
            input.email,
            input.phone,
            password_hash
        ],
    )
    .map_err(|e| HortaError::Database(format!("Failed to create user: {}", e)))?;
    tx.commit()?;

    get_user(conn, &id)?
        .ok_or_else(|| HortaError::Internal("User not found after insert".to_string()))
}

/// Apply a partial update
///
/// `password_hash` replaces the stored hash when the patch carried a new
/// password.
pub fn update_user(
    conn: &mut Connection,
    id: &str,
    patch: UserPatch,
    password_hash: Option<String>,
) -> Result<UserRow, HortaError> {
    let tx = conn.transaction()?;

    let mut user =
        get_user(&tx, id)?.ok_or_else(|| HortaError::NotFound("User not found".to_string()))?;

    if let Some(name) = patch.name {
        require_text(&name, "nome")?;
        user.name = name;
    }
    if let Some(email) = patch.email {
        validate_email(&email)?;
        if let Some(other) = find_user_by_email(&tx, &email)? {
            if other.id != user.id {
                return Err(HortaError::BadRequest("Email already registered".to_string()));
            }
        }
        user.email = email;
    }
    if let Some(phone) = patch.phone {
        user.phone = phone;
    }
    if let Some(group_id) = patch.group_id {
        require_row(&tx, "grupos_usuarios", "id_grupo", &group_id, "Group")?;
        user.group_id = group_id;
    }
    if let Some(hash) = password_hash {
        user.password_hash = hash;
    }

    tx.execute(
        "UPDATE usuarios SET nome = ?, email = ?, telefone = ?, id_grupo = ?, senha = ?
         WHERE id_usuario = ?",
        params![
            user.name,
            user.email,
            user.phone,
            user.group_id,
            user.password_hash,
            user.id
        ],
    )
    .map_err(|e| HortaError::Database(format!("Failed to update user: {}", e)))?;
    tx.commit()?;

    Ok(user)
}

/// Delete a user with no event participations
pub fn delete_user(conn: &mut Connection, id: &str) -> Result<(), HortaError> {
    let tx = conn.transaction()?;

    if get_user(&tx, id)?.is_none() {
        return Err(HortaError::NotFound("User not found".to_string()));
    }
    reject_if_referenced(&tx, "participacao_evento", "id_usuario", &id, "User")?;

    tx.execute("DELETE FROM usuarios WHERE id_usuario = ?", params![id])
        .map_err(|e| HortaError::Database(format!("Failed to delete user: {}", e)))?;
    tx.commit()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn ana() -> CreateUserInput {
        CreateUserInput {
            name: "Ana".into(),
            email: "ana@x.com".into(),
            phone: None,
            group_id: 1,
            password: "pw".into(),
        }
    }

    #[test]
    fn test_create_generates_uuid_and_hides_hash() {
        let mut conn = conn();
        let user = create_user(&mut conn, ana(), "hash".into()).unwrap();

        assert!(Uuid::parse_str(&user.id).is_ok());
        assert_eq!(user.password_hash, "hash");

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["nome"], "Ana");
        assert_eq!(json["id_grupo"], 1);
        assert!(json.get("senha").is_none());
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let mut conn = conn();
        create_user(&mut conn, ana(), "hash".into()).unwrap();

        let err = create_user(&mut conn, ana(), "hash".into()).unwrap_err();
        assert!(matches!(err, HortaError::BadRequest(_)));
        assert_eq!(list_users(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_group_rejected() {
        let mut conn = conn();
        let mut input = ana();
        input.group_id = 99;

        let err = create_user(&mut conn, input, "hash".into()).unwrap_err();
        assert!(matches!(err, HortaError::NotFound(_)));
    }

    #[test]
    fn test_partial_update() {
        let mut conn = conn();
        let mut input = ana();
        input.phone = Some("1199999".into());
        let user = create_user(&mut conn, input, "hash".into()).unwrap();

        let patch = UserPatch {
            name: Some("Ana Maria".into()),
            phone: Some(None),
            ..Default::default()
        };
        let updated = update_user(&mut conn, &user.id, patch, Some("new-hash".into())).unwrap();

        assert_eq!(updated.name, "Ana Maria");
        assert_eq!(updated.email, "ana@x.com");
        assert_eq!(updated.phone, None);
        assert_eq!(
            get_user(&conn, &user.id).unwrap().unwrap().password_hash,
            "new-hash"
        );
    }

    #[test]
    fn test_update_to_taken_email_rejected() {
        let mut conn = conn();
        create_user(&mut conn, ana(), "hash".into()).unwrap();
        let mut bia = ana();
        bia.email = "bia@x.com".into();
        let bia = create_user(&mut conn, bia, "hash".into()).unwrap();

        let patch = UserPatch {
            email: Some("ana@x.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            update_user(&mut conn, &bia.id, patch, None),
            Err(HortaError::BadRequest(_))
        ));
    }

    #[test]
    fn test_delete() {
        let mut conn = conn();
        let user = create_user(&mut conn, ana(), "hash".into()).unwrap();

        delete_user(&mut conn, &user.id).unwrap();
        assert!(get_user(&conn, &user.id).unwrap().is_none());
        assert!(matches!(
            delete_user(&mut conn, &user.id),
            Err(HortaError::NotFound(_))
        ));
    }
}
