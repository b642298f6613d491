//! In-memory implementation of the repositories.
//!
//! Every operation holds a single lock, so check-then-act sequences are
//! atomic exactly like constrained writes on PostgreSQL.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::*;

/// Rows of one table with its own id sequence.
struct Table<T> {
    sequence: i64,
    rows: BTreeMap<i64, T>,
}

impl<T: Clone> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn all(&self) -> Vec<T> {
        self.rows.values().cloned().collect()
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn replace(&mut self, id: i64, row: T) -> bool {
        match self.rows.get_mut(&id) {
            Some(current) => {
                *current = row;
                true
            },
            None => false,
        }
    }

    fn remove(&mut self, id: i64) -> bool {
        self.rows.remove(&id).is_some()
    }
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            sequence: 0,
            rows: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    topics: Table<Topic>,
    goals: Table<Goal>,
    groups: Table<Group>,
    group_goals: Table<GroupGoal>,
    user_groups: Table<UserGroup>,
}

impl Tables {
    fn check_user_unique(&self, user: &User) -> Result<()> {
        for other in self.users.rows.values().filter(|u| u.id != user.id) {
            if other.username == user.username {
                return Err(StoreError::Unique { field: "username" });
            }
            if other.email == user.email {
                return Err(StoreError::Unique { field: "email" });
            }
            if other.matricola == user.matricola {
                return Err(StoreError::Unique { field: "matricola" });
            }
        }
        Ok(())
    }

    fn check_group_references(&self, group: &Group) -> Result<()> {
        if !self.topics.rows.contains_key(&group.topic) {
            return Err(StoreError::MissingReference { field: "topic" });
        }
        Ok(())
    }

    fn check_group_goal_references(&self, record: &GroupGoal) -> Result<()> {
        if !self.groups.rows.contains_key(&record.group) {
            return Err(StoreError::MissingReference { field: "group" });
        }
        if !self.goals.rows.contains_key(&record.goal) {
            return Err(StoreError::MissingReference { field: "goal" });
        }
        Ok(())
    }

    fn check_user_group(&self, record: &UserGroup) -> Result<()> {
        if !self.users.rows.contains_key(&record.user) {
            return Err(StoreError::MissingReference { field: "user" });
        }
        if !self.groups.rows.contains_key(&record.group) {
            return Err(StoreError::MissingReference { field: "group" });
        }
        let duplicate = self.user_groups.rows.values().any(|other| {
            other.id != record.id && other.user == record.user && other.group == record.group
        });
        if duplicate {
            return Err(StoreError::Unique { field: "group" });
        }
        Ok(())
    }
}

/// Store kept in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create a new empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.lock().await.users.all())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.lock().await.users.get(id))
    }

    async fn insert_user(&self, user: &User) -> Result<User> {
        let mut tables = self.tables.lock().await;
        let mut user = user.clone();
        user.id = 0;
        user.group_id = None;
        tables.check_user_unique(&user)?;

        user.id = tables.users.next_id();
        tables.users.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let Some(current) = tables.users.get(user.id) else {
            return Ok(false);
        };
        tables.check_user_unique(user)?;

        // Legacy group is only changed through `claim_user_group`.
        let mut user = user.clone();
        user.group_id = current.group_id;
        user.date_joined = current.date_joined;
        Ok(tables.users.replace(user.id, user))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.user_groups.rows.values().any(|m| m.user == id) {
            return Err(StoreError::Protected { entity: "user" });
        }
        Ok(tables.users.remove(id))
    }

    async fn claim_user_group(&self, id: UserId, group: GroupId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.groups.rows.contains_key(&group) {
            return Err(StoreError::MissingReference { field: "group" });
        }
        match tables.users.rows.get_mut(&id) {
            Some(user) if user.group_id.is_none() => {
                user.group_id = Some(group);
                Ok(true)
            },
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TopicRepository for MemoryStore {
    async fn list_topics(&self) -> Result<Vec<Topic>> {
        Ok(self.tables.lock().await.topics.all())
    }

    async fn find_topic(&self, id: TopicId) -> Result<Option<Topic>> {
        Ok(self.tables.lock().await.topics.get(id))
    }

    async fn insert_topic(&self, topic: &Topic) -> Result<Topic> {
        let mut tables = self.tables.lock().await;
        let mut topic = topic.clone();
        topic.id = tables.topics.next_id();
        tables.topics.rows.insert(topic.id, topic.clone());
        Ok(topic)
    }

    async fn update_topic(&self, topic: &Topic) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.topics.replace(topic.id, topic.clone()))
    }

    async fn delete_topic(&self, id: TopicId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.groups.rows.values().any(|g| g.topic == id) {
            return Err(StoreError::Protected { entity: "topic" });
        }
        Ok(tables.topics.remove(id))
    }
}

#[async_trait]
impl GoalRepository for MemoryStore {
    async fn list_goals(&self) -> Result<Vec<Goal>> {
        Ok(self.tables.lock().await.goals.all())
    }

    async fn find_goal(&self, id: GoalId) -> Result<Option<Goal>> {
        Ok(self.tables.lock().await.goals.get(id))
    }

    async fn insert_goal(&self, goal: &Goal) -> Result<Goal> {
        let mut tables = self.tables.lock().await;
        let mut goal = goal.clone();
        goal.id = tables.goals.next_id();
        tables.goals.rows.insert(goal.id, goal.clone());
        Ok(goal)
    }

    async fn update_goal(&self, goal: &Goal) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        Ok(tables.goals.replace(goal.id, goal.clone()))
    }

    async fn delete_goal(&self, id: GoalId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if tables.group_goals.rows.values().any(|r| r.goal == id) {
            return Err(StoreError::Protected { entity: "goal" });
        }
        Ok(tables.goals.remove(id))
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.tables.lock().await.groups.all())
    }

    async fn find_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.tables.lock().await.groups.get(id))
    }

    async fn insert_group(&self, group: &Group) -> Result<Group> {
        let mut tables = self.tables.lock().await;
        tables.check_group_references(group)?;

        let mut group = group.clone();
        group.id = tables.groups.next_id();
        tables.groups.rows.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update_group(&self, group: &Group) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.groups.rows.contains_key(&group.id) {
            return Ok(false);
        }
        tables.check_group_references(group)?;
        Ok(tables.groups.replace(group.id, group.clone()))
    }

    async fn delete_group(&self, id: GroupId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let referenced = tables.group_goals.rows.values().any(|r| r.group == id)
            || tables.user_groups.rows.values().any(|m| m.group == id)
            || tables.users.rows.values().any(|u| u.group_id == Some(id));
        if referenced {
            return Err(StoreError::Protected { entity: "group" });
        }
        Ok(tables.groups.remove(id))
    }
}

#[async_trait]
impl GroupGoalRepository for MemoryStore {
    async fn list_group_goals(&self) -> Result<Vec<GroupGoal>> {
        Ok(self.tables.lock().await.group_goals.all())
    }

    async fn find_group_goal(&self, id: i64) -> Result<Option<GroupGoal>> {
        Ok(self.tables.lock().await.group_goals.get(id))
    }

    async fn insert_group_goal(&self, record: &GroupGoal) -> Result<GroupGoal> {
        let mut tables = self.tables.lock().await;
        tables.check_group_goal_references(record)?;

        let mut record = record.clone();
        record.id = tables.group_goals.next_id();
        tables.group_goals.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_group_goal(&self, record: &GroupGoal) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.group_goals.rows.contains_key(&record.id) {
            return Ok(false);
        }
        tables.check_group_goal_references(record)?;
        Ok(tables.group_goals.replace(record.id, record.clone()))
    }

    async fn delete_group_goal(&self, id: i64) -> Result<bool> {
        Ok(self.tables.lock().await.group_goals.remove(id))
    }
}

#[async_trait]
impl UserGroupRepository for MemoryStore {
    async fn list_user_groups(&self) -> Result<Vec<UserGroup>> {
        Ok(self.tables.lock().await.user_groups.all())
    }

    async fn find_user_group(&self, id: i64) -> Result<Option<UserGroup>> {
        Ok(self.tables.lock().await.user_groups.get(id))
    }

    async fn insert_user_group(&self, user: UserId, group: GroupId) -> Result<UserGroup> {
        let mut tables = self.tables.lock().await;
        let mut record = UserGroup { id: 0, user, group };
        tables.check_user_group(&record)?;

        record.id = tables.user_groups.next_id();
        tables.user_groups.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_user_group(&self, record: &UserGroup) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.user_groups.rows.contains_key(&record.id) {
            return Ok(false);
        }
        tables.check_user_group(record)?;
        Ok(tables.user_groups.replace(record.id, record.clone()))
    }

    async fn delete_user_group(&self, id: i64) -> Result<bool> {
        Ok(self.tables.lock().await.user_groups.remove(id))
    }

    async fn find_membership(&self, user: UserId, group: GroupId) -> Result<Option<UserGroup>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .user_groups
            .rows
            .values()
            .find(|m| m.user == user && m.group == group)
            .cloned())
    }

    async fn delete_membership(&self, user: UserId, group: GroupId) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        let id = tables
            .user_groups
            .rows
            .values()
            .find(|m| m.user == user && m.group == group)
            .map(|m| m.id);

        Ok(id.is_some_and(|id| tables.user_groups.remove(id)))
    }

    async fn groups_of(&self, user: UserId) -> Result<Vec<GroupId>> {
        let tables = self.tables.lock().await;
        let mut groups: Vec<GroupId> = tables
            .user_groups
            .rows
            .values()
            .filter(|m| m.user == user)
            .map(|m| m.group)
            .collect();
        groups.sort_unstable();
        Ok(groups)
    }
}
