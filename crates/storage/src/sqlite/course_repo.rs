use std::collections::HashSet;

use lms_core::model::{Course, CourseId, UserId};
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use super::mapping::{
    conn, id_i64, map_assignment_row, map_chapter_row, map_progress_row, map_question_row,
    map_quiz_attempt_row, map_quiz_row, map_submission_row, ser,
};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let course_id = id_i64("course_id", course.id.value())?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, title, final_exam_enabled)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                final_exam_enabled = excluded.final_exam_enabled
            ",
        )
        .bind(course_id)
        .bind(&course.title)
        .bind(i64::from(course.final_exam_enabled))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        for chapter in &course.chapters {
            let chapter_id = id_i64("chapter_id", chapter.id.value())?;
            sqlx::query(
                r"
                INSERT INTO chapters (id, course_id, title, position, is_published, is_free, is_preview)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    course_id = excluded.course_id,
                    title = excluded.title,
                    position = excluded.position,
                    is_published = excluded.is_published,
                    is_free = excluded.is_free,
                    is_preview = excluded.is_preview
                ",
            )
            .bind(chapter_id)
            .bind(course_id)
            .bind(&chapter.title)
            .bind(i64::from(chapter.position))
            .bind(i64::from(chapter.is_published))
            .bind(i64::from(chapter.is_free))
            .bind(i64::from(chapter.is_preview))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            for quiz in &chapter.quizzes {
                sqlx::query(
                    r"
                    INSERT INTO quizzes (id, chapter_id, title, position)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(id) DO UPDATE SET
                        chapter_id = excluded.chapter_id,
                        title = excluded.title,
                        position = excluded.position
                    ",
                )
                .bind(id_i64("quiz_id", quiz.id.value())?)
                .bind(chapter_id)
                .bind(&quiz.title)
                .bind(i64::from(quiz.position))
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }

            for assignment in &chapter.assignments {
                sqlx::query(
                    r"
                    INSERT INTO assignments (id, chapter_id, title, is_published, due_date, verification_status)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    ON CONFLICT(id) DO UPDATE SET
                        chapter_id = excluded.chapter_id,
                        title = excluded.title,
                        is_published = excluded.is_published,
                        due_date = excluded.due_date,
                        verification_status = excluded.verification_status
                    ",
                )
                .bind(id_i64("assignment_id", assignment.id.value())?)
                .bind(chapter_id)
                .bind(&assignment.title)
                .bind(i64::from(assignment.is_published))
                .bind(assignment.due_date)
                .bind(assignment.verification_status.as_str())
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
            }
        }

        // Rows missing from the snapshot go; cascades take their learner activity.
        let chapter_ids = course
            .chapters
            .iter()
            .map(|c| id_i64("chapter_id", c.id.value()))
            .collect::<Result<HashSet<_>, _>>()?;
        let quiz_ids = course
            .chapters
            .iter()
            .flat_map(|c| &c.quizzes)
            .map(|q| id_i64("quiz_id", q.id.value()))
            .collect::<Result<HashSet<_>, _>>()?;
        let assignment_ids = course
            .chapters
            .iter()
            .flat_map(|c| &c.assignments)
            .map(|a| id_i64("assignment_id", a.id.value()))
            .collect::<Result<HashSet<_>, _>>()?;

        prune(
            &mut *tx,
            "SELECT id FROM chapters WHERE course_id = ?1",
            "DELETE FROM chapters WHERE id = ?1",
            course_id,
            &chapter_ids,
        )
        .await?;
        prune(
            &mut *tx,
            r"
            SELECT q.id FROM quizzes q
            JOIN chapters c ON c.id = q.chapter_id
            WHERE c.course_id = ?1
            ",
            "DELETE FROM quizzes WHERE id = ?1",
            course_id,
            &quiz_ids,
        )
        .await?;
        prune(
            &mut *tx,
            r"
            SELECT a.id FROM assignments a
            JOIN chapters c ON c.id = a.chapter_id
            WHERE c.course_id = ?1
            ",
            "DELETE FROM assignments WHERE id = ?1",
            course_id,
            &assignment_ids,
        )
        .await?;

        // The question bank is replaced wholesale so removed questions disappear.
        sqlx::query("DELETE FROM exam_questions WHERE course_id = ?1")
            .bind(course_id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in course.exam_questions.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO exam_questions (
                    id, course_id, position, prompt, options,
                    correct_option, explanation, difficulty, topic
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(id_i64("question_id", question.id.value())?)
            .bind(course_id)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(&question.prompt)
            .bind(serde_json::to_string(&question.options).map_err(ser)?)
            .bind(i64::from(question.correct_option))
            .bind(question.explanation.as_deref())
            .bind(question.difficulty.as_str())
            .bind(&question.topic)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_course_with_chapters(
        &self,
        course_id: CourseId,
        user_id: UserId,
    ) -> Result<Option<Course>, StorageError> {
        let course_key = id_i64("course_id", course_id.value())?;
        let user_key = id_i64("user_id", user_id.value())?;

        let Some(row) = sqlx::query("SELECT id, title, final_exam_enabled FROM courses WHERE id = ?1")
            .bind(course_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
        else {
            return Ok(None);
        };

        let mut course = Course::new(course_id, row.try_get::<String, _>("title").map_err(ser)?)
            .with_final_exam(row.try_get::<i64, _>("final_exam_enabled").map_err(ser)? != 0);

        let chapter_rows = sqlx::query(
            r"
            SELECT id, title, position, is_published, is_free, is_preview
            FROM chapters
            WHERE course_id = ?1 AND is_published = 1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(course_key)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        for chapter_row in chapter_rows {
            let mut chapter = map_chapter_row(&chapter_row)?;
            let chapter_key = id_i64("chapter_id", chapter.id.value())?;

            chapter.progress = sqlx::query(
                r"
                SELECT is_completed, completed_at
                FROM chapter_progress
                WHERE user_id = ?1 AND chapter_id = ?2
                ",
            )
            .bind(user_key)
            .bind(chapter_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .map(|row| map_progress_row(&row))
            .transpose()?;

            let quiz_rows = sqlx::query(
                r"
                SELECT id, title, position
                FROM quizzes
                WHERE chapter_id = ?1
                ORDER BY position ASC, id ASC
                ",
            )
            .bind(chapter_key)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

            for quiz_row in quiz_rows {
                let mut quiz = map_quiz_row(&quiz_row)?;
                let attempt_rows = sqlx::query(
                    r"
                    SELECT id, score, submitted_at
                    FROM quiz_attempts
                    WHERE quiz_id = ?1 AND user_id = ?2
                    ORDER BY submitted_at ASC, id ASC
                    ",
                )
                .bind(id_i64("quiz_id", quiz.id.value())?)
                .bind(user_key)
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;
                for attempt_row in attempt_rows {
                    quiz.attempts.push(map_quiz_attempt_row(&attempt_row)?);
                }
                chapter.quizzes.push(quiz);
            }

            let assignment_rows = sqlx::query(
                r"
                SELECT id, title, is_published, due_date, verification_status
                FROM assignments
                WHERE chapter_id = ?1
                ORDER BY id ASC
                ",
            )
            .bind(chapter_key)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

            for assignment_row in assignment_rows {
                let mut assignment = map_assignment_row(&assignment_row)?;
                let submission_rows = sqlx::query(
                    r"
                    SELECT id, status, submitted_at
                    FROM assignment_submissions
                    WHERE assignment_id = ?1 AND user_id = ?2
                    ORDER BY submitted_at ASC, id ASC
                    ",
                )
                .bind(id_i64("assignment_id", assignment.id.value())?)
                .bind(user_key)
                .fetch_all(&self.pool)
                .await
                .map_err(conn)?;
                for submission_row in submission_rows {
                    assignment.submissions.push(map_submission_row(&submission_row)?);
                }
                chapter.assignments.push(assignment);
            }

            course.chapters.push(chapter);
        }

        let question_rows = sqlx::query(
            r"
            SELECT id, prompt, options, correct_option, explanation, difficulty, topic
            FROM exam_questions
            WHERE course_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(course_key)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;
        for question_row in question_rows {
            course.exam_questions.push(map_question_row(&question_row)?);
        }

        Ok(Some(course))
    }
}

/// Deletes every row `select` finds for the course whose id is not in `keep`.
async fn prune(
    db: &mut SqliteConnection,
    select: &str,
    delete: &str,
    course_id: i64,
    keep: &HashSet<i64>,
) -> Result<(), StorageError> {
    let rows = sqlx::query(select)
        .bind(course_id)
        .fetch_all(&mut *db)
        .await
        .map_err(conn)?;
    for row in rows {
        let id: i64 = row.try_get(0).map_err(ser)?;
        if keep.contains(&id) {
            continue;
        }
        sqlx::query(delete)
            .bind(id)
            .execute(&mut *db)
            .await
            .map_err(conn)?;
    }
    Ok(())
}
