//! A store that lives in process memory, for tests and local demos.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::db::{Ratee, SetField, Store};
use crate::error::PaddyResult;
use crate::models::class::Class;
use crate::models::group::Group;
use crate::models::instructor::Instructor;
use crate::models::rating::{Rating, RatingSubmission};
use crate::models::student::Student;
use crate::models::user::User;

#[derive(Default)]
struct Collections {
    users: BTreeMap<i64, User>,
    sessions: HashMap<String, i64>,
    students: BTreeMap<i64, Student>,
    instructors: BTreeMap<i64, Instructor>,
    classes: BTreeMap<i64, Class>,
    groups: BTreeMap<i64, Group>,
}

impl Collections {
    fn id_set(&mut self, field: SetField, id: i64) -> Option<&mut Vec<i64>> {
        match field {
            SetField::ClassStudents => self.classes.get_mut(&id).map(|c| &mut c.students),
            SetField::ClassGroups => self.classes.get_mut(&id).map(|c| &mut c.groups),
            SetField::InstructorClasses => self.instructors.get_mut(&id).map(|i| &mut i.classes),
            SetField::InstructorGroups => self.instructors.get_mut(&id).map(|i| &mut i.groups),
            SetField::StudentClasses => self.students.get_mut(&id).map(|s| &mut s.classes),
            SetField::StudentGroups => self.students.get_mut(&id).map(|s| &mut s.groups),
            SetField::GroupStudents => self.groups.get_mut(&id).map(|g| &mut g.students),
        }
    }

    fn ratings_of(&mut self, ratee: Ratee) -> Option<&mut Vec<Rating>> {
        match ratee {
            Ratee::Student(id) => self.students.get_mut(&id).map(|s| &mut s.ratings),
            Ratee::Instructor(id) => self.instructors.get_mut(&id).map(|i| &mut i.ratings),
        }
    }
}

/// Every collection behind one lock, so each call is atomic like a
/// single-document database write.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

#[async_trait]
impl Store for MemoryStore {
    async fn user(&self, id: i64) -> PaddyResult<Option<User>> {
        Ok(self.collections.lock().await.users.get(&id).cloned())
    }

    async fn user_by_login(&self, login: &str) -> PaddyResult<Option<User>> {
        let collections = self.collections.lock().await;
        let user = collections
            .users
            .values()
            .find(|user| user.username == login || user.email == login);

        Ok(user.cloned())
    }

    async fn insert_user(&self, user: User) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        let taken = collections.users.values().any(|existing| {
            existing.id == user.id
                || existing.email == user.email
                || existing.username == user.username
        });
        if taken {
            return Ok(false);
        }
        collections.users.insert(user.id, user);

        Ok(true)
    }

    async fn session_user(&self, token: &str) -> PaddyResult<Option<i64>> {
        Ok(self.collections.lock().await.sessions.get(token).copied())
    }

    async fn session_for_user(&self, user_id: i64) -> PaddyResult<Option<String>> {
        let collections = self.collections.lock().await;
        let token = collections
            .sessions
            .iter()
            .find(|(_, id)| **id == user_id)
            .map(|(token, _)| token.clone());

        Ok(token)
    }

    async fn insert_session(&self, token: &str, user_id: i64) -> PaddyResult<()> {
        let mut collections = self.collections.lock().await;
        collections.sessions.insert(token.to_owned(), user_id);

        Ok(())
    }

    async fn remove_sessions(&self, user_id: i64) -> PaddyResult<()> {
        let mut collections = self.collections.lock().await;
        collections.sessions.retain(|_, id| *id != user_id);

        Ok(())
    }

    async fn student(&self, id: i64) -> PaddyResult<Option<Student>> {
        Ok(self.collections.lock().await.students.get(&id).cloned())
    }

    async fn students(&self, ids: &[i64]) -> PaddyResult<Vec<Student>> {
        let collections = self.collections.lock().await;
        let mut students: Vec<Student> = ids
            .iter()
            .filter_map(|id| collections.students.get(id).cloned())
            .collect();
        students.sort_by_key(|student| student.id);
        students.dedup_by_key(|student| student.id);

        Ok(students)
    }

    async fn insert_students(&self, students: Vec<Student>) -> PaddyResult<usize> {
        let mut collections = self.collections.lock().await;
        let mut inserted = 0;
        for student in students {
            if !collections.students.contains_key(&student.id) {
                collections.students.insert(student.id, student);
                inserted += 1;
            }
        }

        Ok(inserted)
    }

    async fn instructor(&self, id: i64) -> PaddyResult<Option<Instructor>> {
        Ok(self.collections.lock().await.instructors.get(&id).cloned())
    }

    async fn insert_instructor(&self, instructor: Instructor) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        if collections.instructors.contains_key(&instructor.id) {
            return Ok(false);
        }
        collections.instructors.insert(instructor.id, instructor);

        Ok(true)
    }

    async fn class(&self, id: i64) -> PaddyResult<Option<Class>> {
        Ok(self.collections.lock().await.classes.get(&id).cloned())
    }

    async fn classes(&self, ids: &[i64]) -> PaddyResult<Vec<Class>> {
        let collections = self.collections.lock().await;
        let mut classes: Vec<Class> = ids
            .iter()
            .filter_map(|id| collections.classes.get(id).cloned())
            .collect();
        classes.sort_by_key(|class| class.id);
        classes.dedup_by_key(|class| class.id);

        Ok(classes)
    }

    async fn insert_class(&self, class: Class) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        if collections.classes.contains_key(&class.id) {
            return Ok(false);
        }
        collections.classes.insert(class.id, class);

        Ok(true)
    }

    async fn set_submission_deadline(
        &self,
        class_id: i64,
        deadline: Option<OffsetDateTime>,
    ) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        match collections.classes.get_mut(&class_id) {
            Some(class) => {
                class.submission_deadline = deadline;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn group(&self, id: i64) -> PaddyResult<Option<Group>> {
        Ok(self.collections.lock().await.groups.get(&id).cloned())
    }

    async fn groups_for_class(&self, class_id: i64) -> PaddyResult<Vec<Group>> {
        let collections = self.collections.lock().await;
        let groups = collections
            .groups
            .values()
            .filter(|group| group.class == class_id)
            .cloned()
            .collect();

        Ok(groups)
    }

    async fn insert_group(&self, group: Group) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        if collections.groups.contains_key(&group.id) {
            return Ok(false);
        }
        collections.groups.insert(group.id, group);

        Ok(true)
    }

    async fn add_to_set(&self, field: SetField, id: i64, value: i64) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        match collections.id_set(field, id) {
            Some(set) => {
                if !set.contains(&value) {
                    set.push(value);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_from_set(&self, field: SetField, id: i64, value: i64) -> PaddyResult<bool> {
        let mut collections = self.collections.lock().await;
        match collections.id_set(field, id) {
            Some(set) => {
                set.retain(|existing| *existing != value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_rating(
        &self,
        ratee: Ratee,
        submission: &RatingSubmission,
    ) -> PaddyResult<Option<bool>> {
        let mut collections = self.collections.lock().await;

        Ok(collections
            .ratings_of(ratee)
            .map(|ratings| Rating::record(ratings, submission)))
    }

    async fn increment_grains(&self, student_id: i64, amount: i64) -> PaddyResult<Option<i64>> {
        let mut collections = self.collections.lock().await;

        Ok(collections.students.get_mut(&student_id).map(|student| {
            student.rice_grains += amount;
            student.rice_grains
        }))
    }
}
