//! Postgres store
//!
//! [`Store`] over a `sqlx::PgPool`. The schema lives in `migrations/` and
//! carries the uniqueness and foreign-key constraints the gateway relies
//! on; violations come back as [`StoreError::Conflict`] and
//! [`StoreError::MissingReference`] through `From<sqlx::Error>`.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{Store, StoreError};
use crate::shared::messaging::{
    DirectMessage, Group, GroupMember, GroupMemberView, GroupMessage, GroupMessageView, Role,
    SenderInfo, User, UserProfile,
};

const DIRECT_MESSAGE_COLUMNS: &str =
    "id, content, sender_id, receiver_id, is_read, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        role: Role::from_db(row.get::<String, _>("role").as_str()),
        is_verified: row.get("is_verified"),
        created_at: row.get("created_at"),
    }
}

fn direct_message_from_row(row: &PgRow) -> DirectMessage {
    DirectMessage {
        id: row.get("id"),
        content: row.get("content"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        read: row.get("is_read"),
        created_at: row.get("created_at"),
    }
}

fn group_from_row(row: &PgRow) -> Group {
    Group {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

fn member_from_row(row: &PgRow) -> GroupMember {
    GroupMember {
        id: row.get("id"),
        user_id: row.get("user_id"),
        group_id: row.get("group_id"),
        is_admin: row.get("is_admin"),
        joined_at: row.get("joined_at"),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: &User) -> Result<User, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, role, is_verified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, email, display_name, role, is_verified, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.is_verified)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(&row))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, email, display_name, role, is_verified, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_direct_message(
        &self,
        message: &DirectMessage,
    ) -> Result<DirectMessage, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO direct_messages (id, content, sender_id, receiver_id, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {DIRECT_MESSAGE_COLUMNS}
            "#
        ))
        .bind(message.id)
        .bind(&message.content)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.read)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(direct_message_from_row(&row))
    }

    async fn get_direct_message(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {DIRECT_MESSAGE_COLUMNS} FROM direct_messages WHERE id = $1"
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(direct_message_from_row))
    }

    async fn mark_direct_message_read(
        &self,
        message_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        // Conditional update: concurrent callers collapse onto one effective write
        let row = sqlx::query(&format!(
            r#"
            UPDATE direct_messages
            SET is_read = TRUE
            WHERE id = $1 AND NOT is_read
            RETURNING {DIRECT_MESSAGE_COLUMNS}
            "#
        ))
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(direct_message_from_row))
    }

    async fn list_conversation_partners(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT partner_id
            FROM (
                SELECT CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END AS partner_id,
                       MAX(seq) AS last_seq
                FROM direct_messages
                WHERE sender_id = $1 OR receiver_id = $1
                GROUP BY 1
            ) partners
            ORDER BY last_seq DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("partner_id")).collect())
    }

    async fn latest_direct_message(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Option<DirectMessage>, StoreError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {DIRECT_MESSAGE_COLUMNS}
            FROM direct_messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at DESC, seq DESC
            LIMIT 1
            "#
        ))
        .bind(user_id)
        .bind(other_user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(direct_message_from_row))
    }

    async fn count_unread(&self, receiver_id: Uuid, sender_id: Uuid) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM direct_messages
            WHERE receiver_id = $1 AND sender_id = $2 AND NOT is_read
            "#,
        )
        .bind(receiver_id)
        .bind(sender_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.max(0) as u64)
    }

    async fn list_direct_messages(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {DIRECT_MESSAGE_COLUMNS}
            FROM direct_messages
            WHERE (sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(user_id)
        .bind(other_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(direct_message_from_row).collect())
    }

    async fn mark_conversation_read(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE direct_messages
            SET is_read = TRUE
            WHERE receiver_id = $1 AND sender_id = $2 AND NOT is_read
            "#,
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn create_group(
        &self,
        group: &Group,
        creator_id: Uuid,
    ) -> Result<(Group, GroupMember), StoreError> {
        let mut tx = self.pool.begin().await?;

        let group_row = sqlx::query(
            r#"
            INSERT INTO chat_groups (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let admin = GroupMember::new(creator_id, group.id, true);
        let member_row = sqlx::query(
            r#"
            INSERT INTO group_members (id, user_id, group_id, is_admin, joined_at)
            VALUES ($1, $2, $3, TRUE, $4)
            RETURNING id, user_id, group_id, is_admin, joined_at
            "#,
        )
        .bind(admin.id)
        .bind(admin.user_id)
        .bind(admin.group_id)
        .bind(admin.joined_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((group_from_row(&group_row), member_from_row(&member_row)))
    }

    async fn get_group(&self, group_id: Uuid) -> Result<Option<Group>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, created_at FROM chat_groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(group_from_row))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, description, created_at FROM chat_groups ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn list_groups_for_user(&self, user_id: Uuid) -> Result<Vec<Group>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT g.id, g.name, g.description, g.created_at
            FROM chat_groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(group_from_row).collect())
    }

    async fn delete_group(&self, group_id: Uuid) -> Result<bool, StoreError> {
        // memberships and messages go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM chat_groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_membership(
        &self,
        user_id: Uuid,
        group_id: Uuid,
    ) -> Result<Option<GroupMember>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, group_id, is_admin, joined_at
            FROM group_members
            WHERE user_id = $1 AND group_id = $2
            "#,
        )
        .bind(user_id)
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(member_from_row))
    }

    async fn list_memberships_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<GroupMember>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, group_id, is_admin, joined_at
            FROM group_members
            WHERE user_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(member_from_row).collect())
    }

    async fn insert_membership(&self, member: &GroupMember) -> Result<GroupMember, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO group_members (id, user_id, group_id, is_admin, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, group_id, is_admin, joined_at
            "#,
        )
        .bind(member.id)
        .bind(member.user_id)
        .bind(member.group_id)
        .bind(member.is_admin)
        .bind(member.joined_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(member_from_row(&row))
    }

    async fn delete_membership(&self, user_id: Uuid, group_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM group_members WHERE user_id = $1 AND group_id = $2")
            .bind(user_id)
            .bind(group_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, group_id: Uuid) -> Result<Vec<GroupMemberView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.user_id, m.is_admin, m.joined_at, u.display_name, u.email
            FROM group_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.group_id = $1
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| GroupMemberView {
                id: row.get("id"),
                user_id: row.get("user_id"),
                is_admin: row.get("is_admin"),
                joined_at: row.get("joined_at"),
                user: UserProfile {
                    id: row.get("user_id"),
                    display_name: row.get("display_name"),
                    email: row.get("email"),
                },
            })
            .collect())
    }

    async fn insert_group_message(
        &self,
        message: &GroupMessage,
    ) -> Result<GroupMessage, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO group_messages (id, content, user_id, group_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, content, user_id, group_id, created_at
            "#,
        )
        .bind(message.id)
        .bind(&message.content)
        .bind(message.user_id)
        .bind(message.group_id)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(GroupMessage {
            id: row.get("id"),
            content: row.get("content"),
            user_id: row.get("user_id"),
            group_id: row.get("group_id"),
            created_at: row.get("created_at"),
        })
    }

    async fn list_group_messages(
        &self,
        group_id: Uuid,
    ) -> Result<Vec<GroupMessageView>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT gm.id, gm.content, gm.user_id, gm.group_id, gm.created_at, u.display_name
            FROM group_messages gm
            JOIN users u ON u.id = gm.user_id
            WHERE gm.group_id = $1
            ORDER BY gm.created_at ASC, gm.seq ASC
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| GroupMessageView {
                message: GroupMessage {
                    id: row.get("id"),
                    content: row.get("content"),
                    user_id: row.get("user_id"),
                    group_id: row.get("group_id"),
                    created_at: row.get("created_at"),
                },
                user: SenderInfo {
                    id: row.get("user_id"),
                    display_name: row.get("display_name"),
                },
            })
            .collect())
    }
}
