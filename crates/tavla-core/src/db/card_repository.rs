//! Card repository, including the card↔user and card↔label relation rows

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{Card, CardLabelAssignment, CardUserAssignment, Label, SyncStatus, User};

const CARD_COLUMNS: &str = "local_id, id, account_id, stack_local_id, title, description, \
                            due_date, sort_order, last_modified_local, status";

/// Storage operations for cards and their relation rows.
///
/// A relation row is keyed by its pair of local foreign keys; its `status`
/// column marks pending assign (`LocalEdited`) and unassign (`LocalDeleted`)
/// pushes. Both foreign keys must reference live rows.
pub struct CardRepository<'a> {
    conn: &'a Connection,
}

impl<'a> CardRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a card row and return it with its assigned local id
    pub async fn insert(&self, card: &Card) -> Result<Card> {
        self.conn
            .execute(
                "INSERT INTO cards (id, account_id, stack_local_id, title, description,
                                    due_date, sort_order, last_modified_local, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    card.id,
                    card.account_id,
                    card.stack_local_id,
                    card.title.as_str(),
                    card.description.as_str(),
                    card.due_date,
                    card.sort_order,
                    card.last_modified_local,
                    card.status.as_i64()
                ],
            )
            .await?;

        let local_id = self.conn.last_insert_rowid();
        self.get(card.account_id, local_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("card {local_id}")))
    }

    /// Get a card by `(account_id, local_id)`
    pub async fn get(&self, account_id: i64, local_id: i64) -> Result<Option<Card>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards WHERE account_id = ?1 AND local_id = ?2"
                ),
                params![account_id, local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_card(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a card by `(account_id, remote id)`
    pub async fn find_by_remote_id(&self, account_id: i64, id: i64) -> Result<Option<Card>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE account_id = ?1 AND id = ?2"),
                params![account_id, id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_card(&row)?)),
            None => Ok(None),
        }
    }

    /// List visible cards of a stack in stack order
    pub async fn list_for_stack(&self, stack_local_id: i64) -> Result<Vec<Card>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {CARD_COLUMNS} FROM cards
                     WHERE stack_local_id = ?1 AND status <> ?2
                     ORDER BY sort_order, local_id"
                ),
                params![stack_local_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut cards = Vec::new();
        while let Some(row) = rows.next().await? {
            cards.push(Self::parse_card(&row)?);
        }
        Ok(cards)
    }

    /// List every card row of a stack, tombstones included (sync scans)
    pub async fn list_all_for_stack(&self, stack_local_id: i64) -> Result<Vec<Card>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {CARD_COLUMNS} FROM cards WHERE stack_local_id = ?1"),
                params![stack_local_id],
            )
            .await?;

        let mut cards = Vec::new();
        while let Some(row) = rows.next().await? {
            cards.push(Self::parse_card(&row)?);
        }
        Ok(cards)
    }

    /// Apply a local edit: overwrite user-editable fields and mark dirty
    pub async fn update_content(
        &self,
        local_id: i64,
        title: &str,
        description: &str,
        due_date: Option<i64>,
        sort_order: i64,
        now: i64,
    ) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE cards
                 SET title = ?1, description = ?2, due_date = ?3, sort_order = ?4,
                     last_modified_local = ?5, status = ?6
                 WHERE local_id = ?7",
                params![
                    title,
                    description,
                    due_date,
                    sort_order,
                    now,
                    SyncStatus::LocalEdited.as_i64(),
                    local_id
                ],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("card {local_id}")));
        }
        Ok(())
    }

    /// Overwrite fields from a pulled server row and mark the row clean
    pub async fn apply_pull(
        &self,
        local_id: i64,
        title: &str,
        description: &str,
        due_date: Option<i64>,
        sort_order: i64,
        last_modified: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE cards
                 SET title = ?1, description = ?2, due_date = ?3, sort_order = ?4,
                     last_modified_local = ?5, status = ?6
                 WHERE local_id = ?7",
                params![
                    title,
                    description,
                    due_date,
                    sort_order,
                    last_modified,
                    SyncStatus::UpToDate.as_i64(),
                    local_id
                ],
            )
            .await?;
        Ok(())
    }

    /// Move a card under another stack (server-side moves observed on pull)
    pub async fn reparent(&self, local_id: i64, stack_local_id: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE cards SET stack_local_id = ?1 WHERE local_id = ?2",
                params![stack_local_id, local_id],
            )
            .await?;
        Ok(())
    }

    /// Record a successful push: store the server id and mark the row clean
    pub async fn mark_synced(&self, local_id: i64, id: i64, last_modified: i64) -> Result<()> {
        self.conn
            .execute(
                "UPDATE cards SET id = ?1, last_modified_local = ?2, status = ?3
                 WHERE local_id = ?4",
                params![id, last_modified, SyncStatus::UpToDate.as_i64(), local_id],
            )
            .await?;
        Ok(())
    }

    /// Tombstone a card for a later delete push
    pub async fn tombstone(&self, local_id: i64, now: i64) -> Result<()> {
        let affected = self
            .conn
            .execute(
                "UPDATE cards SET status = ?1, last_modified_local = ?2 WHERE local_id = ?3",
                params![SyncStatus::LocalDeleted.as_i64(), now, local_id],
            )
            .await?;
        if affected == 0 {
            return Err(Error::NotFound(format!("card {local_id}")));
        }
        Ok(())
    }

    /// Physically remove a card; its join rows cascade
    pub async fn purge(&self, local_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM cards WHERE local_id = ?1", params![local_id])
            .await?;
        Ok(())
    }

    // ## Card <-> user relation

    /// Request assigning a user to a card (pending until pushed).
    ///
    /// Re-assigning while an unassign push is pending restores the synced
    /// relation; assigning an already assigned user is a no-op.
    pub async fn request_user_assignment(
        &self,
        card_local_id: i64,
        user_local_id: i64,
    ) -> Result<()> {
        self.ensure_live("cards", card_local_id).await?;
        self.ensure_live("users", user_local_id).await?;

        match self.user_assignment(card_local_id, user_local_id).await? {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO card_users (card_local_id, user_local_id, status)
                         VALUES (?1, ?2, ?3)",
                        params![card_local_id, user_local_id, SyncStatus::LocalEdited.as_i64()],
                    )
                    .await?;
            }
            Some(row) if row.status == SyncStatus::LocalDeleted => {
                self.set_user_assignment_status(card_local_id, user_local_id, SyncStatus::UpToDate)
                    .await?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Request unassigning a user from a card (pending until pushed).
    ///
    /// An assignment the server never saw is removed outright.
    pub async fn request_user_unassignment(
        &self,
        card_local_id: i64,
        user_local_id: i64,
    ) -> Result<()> {
        let Some(row) = self.user_assignment(card_local_id, user_local_id).await? else {
            return Err(Error::NotFound(format!(
                "assignment of user {user_local_id} to card {card_local_id}"
            )));
        };

        if row.status == SyncStatus::LocalEdited {
            self.delete_user_assignment(card_local_id, user_local_id)
                .await
        } else {
            self.set_user_assignment_status(card_local_id, user_local_id, SyncStatus::LocalDeleted)
                .await
        }
    }

    /// A single relation row, if present
    pub async fn user_assignment(
        &self,
        card_local_id: i64,
        user_local_id: i64,
    ) -> Result<Option<CardUserAssignment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT card_local_id, user_local_id, status FROM card_users
                 WHERE card_local_id = ?1 AND user_local_id = ?2",
                params![card_local_id, user_local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(CardUserAssignment {
                card_local_id: row.get(0)?,
                user_local_id: row.get(1)?,
                status: SyncStatus::from_i64(row.get(2)?)?,
            })),
            None => Ok(None),
        }
    }

    /// Users currently assigned to a card, as the user sees it
    pub async fn users_for_card(&self, card_local_id: i64) -> Result<Vec<User>> {
        let mut rows = self
            .conn
            .query(
                "SELECT u.local_id, u.account_id, u.uid, u.display_name,
                        u.last_modified_local, u.status
                 FROM users u
                 JOIN card_users cu ON cu.user_local_id = u.local_id
                 WHERE cu.card_local_id = ?1 AND cu.status <> ?2 AND u.status <> ?2
                 ORDER BY u.display_name COLLATE NOCASE",
                params![card_local_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(User {
                local_id: row.get(0)?,
                account_id: row.get(1)?,
                uid: row.get(2)?,
                display_name: row.get(3)?,
                last_modified_local: row.get(4)?,
                status: SyncStatus::from_i64(row.get(5)?)?,
            });
        }
        Ok(users)
    }

    /// All user-relation rows of a card, pending ones included
    pub async fn user_assignments_for_card(
        &self,
        card_local_id: i64,
    ) -> Result<Vec<CardUserAssignment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT card_local_id, user_local_id, status FROM card_users
                 WHERE card_local_id = ?1",
                params![card_local_id],
            )
            .await?;

        let mut assignments = Vec::new();
        while let Some(row) = rows.next().await? {
            assignments.push(CardUserAssignment {
                card_local_id: row.get(0)?,
                user_local_id: row.get(1)?,
                status: SyncStatus::from_i64(row.get(2)?)?,
            });
        }
        Ok(assignments)
    }

    /// User-relation rows with a pending push, across an account
    pub async fn pending_user_assignments(
        &self,
        account_id: i64,
    ) -> Result<Vec<CardUserAssignment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT cu.card_local_id, cu.user_local_id, cu.status
                 FROM card_users cu
                 JOIN cards c ON c.local_id = cu.card_local_id
                 WHERE c.account_id = ?1 AND cu.status <> ?2",
                params![account_id, SyncStatus::UpToDate.as_i64()],
            )
            .await?;

        let mut assignments = Vec::new();
        while let Some(row) = rows.next().await? {
            assignments.push(CardUserAssignment {
                card_local_id: row.get(0)?,
                user_local_id: row.get(1)?,
                status: SyncStatus::from_i64(row.get(2)?)?,
            });
        }
        Ok(assignments)
    }

    /// Set a user-relation row's status
    pub async fn set_user_assignment_status(
        &self,
        card_local_id: i64,
        user_local_id: i64,
        status: SyncStatus,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE card_users SET status = ?1
                 WHERE card_local_id = ?2 AND user_local_id = ?3",
                params![status.as_i64(), card_local_id, user_local_id],
            )
            .await?;
        Ok(())
    }

    /// Remove a user-relation row
    pub async fn delete_user_assignment(
        &self,
        card_local_id: i64,
        user_local_id: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM card_users WHERE card_local_id = ?1 AND user_local_id = ?2",
                params![card_local_id, user_local_id],
            )
            .await?;
        Ok(())
    }

    /// Make the synced user relations of a card match a fresh server listing.
    ///
    /// Pending rows are left for their push to decide; synced rows absent
    /// from the listing are removed, listed users missing a row get one.
    pub async fn reconcile_pulled_user_assignments(
        &self,
        card_local_id: i64,
        remote_user_local_ids: &[i64],
    ) -> Result<()> {
        for user_local_id in remote_user_local_ids {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO card_users (card_local_id, user_local_id, status)
                     VALUES (?1, ?2, ?3)",
                    params![card_local_id, *user_local_id, SyncStatus::UpToDate.as_i64()],
                )
                .await?;
        }

        if remote_user_local_ids.is_empty() {
            self.conn
                .execute(
                    "DELETE FROM card_users WHERE card_local_id = ?1 AND status = ?2",
                    params![card_local_id, SyncStatus::UpToDate.as_i64()],
                )
                .await?;
            return Ok(());
        }

        let keep = remote_user_local_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.conn
            .execute(
                &format!(
                    "DELETE FROM card_users
                     WHERE card_local_id = ?1 AND status = ?2
                       AND user_local_id NOT IN ({keep})"
                ),
                params![card_local_id, SyncStatus::UpToDate.as_i64()],
            )
            .await?;
        Ok(())
    }

    // ## Card <-> label relation

    /// Request attaching a label to a card (pending until pushed)
    pub async fn request_label_assignment(
        &self,
        card_local_id: i64,
        label_local_id: i64,
    ) -> Result<()> {
        self.ensure_live("cards", card_local_id).await?;
        self.ensure_live("labels", label_local_id).await?;

        match self.label_assignment(card_local_id, label_local_id).await? {
            None => {
                self.conn
                    .execute(
                        "INSERT INTO card_labels (card_local_id, label_local_id, status)
                         VALUES (?1, ?2, ?3)",
                        params![
                            card_local_id,
                            label_local_id,
                            SyncStatus::LocalEdited.as_i64()
                        ],
                    )
                    .await?;
            }
            Some(row) if row.status == SyncStatus::LocalDeleted => {
                self.set_label_assignment_status(
                    card_local_id,
                    label_local_id,
                    SyncStatus::UpToDate,
                )
                .await?;
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Request detaching a label from a card (pending until pushed)
    pub async fn request_label_unassignment(
        &self,
        card_local_id: i64,
        label_local_id: i64,
    ) -> Result<()> {
        let Some(row) = self.label_assignment(card_local_id, label_local_id).await? else {
            return Err(Error::NotFound(format!(
                "assignment of label {label_local_id} to card {card_local_id}"
            )));
        };

        if row.status == SyncStatus::LocalEdited {
            self.delete_label_assignment(card_local_id, label_local_id)
                .await
        } else {
            self.set_label_assignment_status(card_local_id, label_local_id, SyncStatus::LocalDeleted)
                .await
        }
    }

    /// A single relation row, if present
    pub async fn label_assignment(
        &self,
        card_local_id: i64,
        label_local_id: i64,
    ) -> Result<Option<CardLabelAssignment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT card_local_id, label_local_id, status FROM card_labels
                 WHERE card_local_id = ?1 AND label_local_id = ?2",
                params![card_local_id, label_local_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(CardLabelAssignment {
                card_local_id: row.get(0)?,
                label_local_id: row.get(1)?,
                status: SyncStatus::from_i64(row.get(2)?)?,
            })),
            None => Ok(None),
        }
    }

    /// Labels currently attached to a card, as the user sees it
    pub async fn labels_for_card(&self, card_local_id: i64) -> Result<Vec<Label>> {
        let mut rows = self
            .conn
            .query(
                "SELECT l.local_id, l.id, l.account_id, l.board_local_id, l.title, l.color,
                        l.last_modified_local, l.status
                 FROM labels l
                 JOIN card_labels cl ON cl.label_local_id = l.local_id
                 WHERE cl.card_local_id = ?1 AND cl.status <> ?2 AND l.status <> ?2
                 ORDER BY l.title COLLATE NOCASE",
                params![card_local_id, SyncStatus::LocalDeleted.as_i64()],
            )
            .await?;

        let mut labels = Vec::new();
        while let Some(row) = rows.next().await? {
            labels.push(Label {
                local_id: row.get(0)?,
                id: row.get(1)?,
                account_id: row.get(2)?,
                board_local_id: row.get(3)?,
                title: row.get(4)?,
                color: row.get(5)?,
                last_modified_local: row.get(6)?,
                status: SyncStatus::from_i64(row.get(7)?)?,
            });
        }
        Ok(labels)
    }

    /// Label-relation rows with a pending push, across an account
    pub async fn pending_label_assignments(
        &self,
        account_id: i64,
    ) -> Result<Vec<CardLabelAssignment>> {
        let mut rows = self
            .conn
            .query(
                "SELECT cl.card_local_id, cl.label_local_id, cl.status
                 FROM card_labels cl
                 JOIN cards c ON c.local_id = cl.card_local_id
                 WHERE c.account_id = ?1 AND cl.status <> ?2",
                params![account_id, SyncStatus::UpToDate.as_i64()],
            )
            .await?;

        let mut assignments = Vec::new();
        while let Some(row) = rows.next().await? {
            assignments.push(CardLabelAssignment {
                card_local_id: row.get(0)?,
                label_local_id: row.get(1)?,
                status: SyncStatus::from_i64(row.get(2)?)?,
            });
        }
        Ok(assignments)
    }

    /// Set a label-relation row's status
    pub async fn set_label_assignment_status(
        &self,
        card_local_id: i64,
        label_local_id: i64,
        status: SyncStatus,
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE card_labels SET status = ?1
                 WHERE card_local_id = ?2 AND label_local_id = ?3",
                params![status.as_i64(), card_local_id, label_local_id],
            )
            .await?;
        Ok(())
    }

    /// Remove a label-relation row
    pub async fn delete_label_assignment(
        &self,
        card_local_id: i64,
        label_local_id: i64,
    ) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM card_labels WHERE card_local_id = ?1 AND label_local_id = ?2",
                params![card_local_id, label_local_id],
            )
            .await?;
        Ok(())
    }

    /// Make the synced label relations of a card match a fresh server listing
    pub async fn reconcile_pulled_label_assignments(
        &self,
        card_local_id: i64,
        remote_label_local_ids: &[i64],
    ) -> Result<()> {
        for label_local_id in remote_label_local_ids {
            self.conn
                .execute(
                    "INSERT OR IGNORE INTO card_labels (card_local_id, label_local_id, status)
                     VALUES (?1, ?2, ?3)",
                    params![
                        card_local_id,
                        *label_local_id,
                        SyncStatus::UpToDate.as_i64()
                    ],
                )
                .await?;
        }

        if remote_label_local_ids.is_empty() {
            self.conn
                .execute(
                    "DELETE FROM card_labels WHERE card_local_id = ?1 AND status = ?2",
                    params![card_local_id, SyncStatus::UpToDate.as_i64()],
                )
                .await?;
            return Ok(());
        }

        let keep = remote_label_local_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.conn
            .execute(
                &format!(
                    "DELETE FROM card_labels
                     WHERE card_local_id = ?1 AND status = ?2
                       AND label_local_id NOT IN ({keep})"
                ),
                params![card_local_id, SyncStatus::UpToDate.as_i64()],
            )
            .await?;
        Ok(())
    }

    /// Reject relation writes against tombstoned or missing rows
    async fn ensure_live(&self, table: &str, local_id: i64) -> Result<()> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT status FROM {table} WHERE local_id = ?1"),
                params![local_id],
            )
            .await?;

        match rows.next().await? {
            None => Err(Error::Constraint(format!(
                "relation references missing row {local_id} in {table}"
            ))),
            Some(row) => {
                let status = SyncStatus::from_i64(row.get(0)?)?;
                if status == SyncStatus::LocalDeleted {
                    Err(Error::Constraint(format!(
                        "relation references deleted row {local_id} in {table}"
                    )))
                } else {
                    Ok(())
                }
            }
        }
    }

    fn parse_card(row: &libsql::Row) -> Result<Card> {
        Ok(Card {
            local_id: row.get(0)?,
            id: row.get(1)?,
            account_id: row.get(2)?,
            stack_local_id: row.get(3)?,
            title: row.get(4)?,
            description: row.get(5)?,
            due_date: row.get(6)?,
            sort_order: row.get(7)?,
            last_modified_local: row.get(8)?,
            status: SyncStatus::from_i64(row.get(9)?)?,
        })
    }
}
