//! Read-only attendance summaries built from committed records.
//!
//! Percentages use "sessions that ever had a poll" as the denominator, not
//! every scheduled session: a session nobody took attendance for does not
//! count against anyone.

use std::collections::{BTreeMap, HashMap, HashSet};

use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{AppError, AppResult};
use crate::models::{
    Class, CourseAttendanceGroup, CourseRecords, CourseSummary, MarkedAt, SessionAttendance,
    SessionOverview, SessionPresence, SessionWithPresence, StudentCourseAttendance,
    StudentHistory, StudentRecordRow, StudentSummary,
};
use crate::state::AppState;

/// Whole-number percentage, half rounded up; zero sessions yields 0.
pub fn attendance_percentage(present: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (present * 200 + total) / (2 * total);
    u32::try_from(rounded.min(100)).unwrap_or(100)
}

async fn staff_class(state: &AppState, principal: &Principal, class_id: Uuid) -> AppResult<Class> {
    let class = state
        .roster
        .class(class_id)
        .await?
        .ok_or_else(|| AppError::not_found("course not found"))?;

    if principal.is_admin() || state.roster.is_instructor_of(principal.id, class_id).await? {
        Ok(class)
    } else {
        Err(AppError::forbidden(
            "only instructors can view course attendance",
        ))
    }
}

pub async fn session_attendance(
    state: &AppState,
    principal: &Principal,
    session_id: Uuid,
) -> AppResult<SessionAttendance> {
    let session = state
        .roster
        .session(session_id)
        .await?
        .ok_or_else(|| AppError::not_found("session not found"))?;

    if !principal.is_admin()
        && !state
            .roster
            .is_instructor_of(principal.id, session.class_id)
            .await?
    {
        return Err(AppError::forbidden(
            "only instructors can view session attendance",
        ));
    }

    let polls = state.store.session_polls(session.id).await?;
    let attendance = state.store.session_attendees(session.id).await?;

    Ok(SessionAttendance {
        session_id: session.id,
        polls,
        attendance,
    })
}

pub async fn course_summary(
    state: &AppState,
    principal: &Principal,
    class_id: Uuid,
) -> AppResult<CourseSummary> {
    let class = staff_class(state, principal, class_id).await?;

    let mut sessions = state.roster.sessions_of(class.id).await?;
    sessions.reverse();
    let polled: HashSet<Uuid> = state
        .store
        .polled_sessions(class.id)
        .await?
        .into_iter()
        .collect();
    let records = state.store.class_records(class.id).await?;
    let students = state.roster.students_of(class.id).await?;

    let mut per_session: HashMap<Uuid, usize> = HashMap::new();
    let mut per_student: HashMap<Uuid, HashMap<Uuid, SessionPresence>> = HashMap::new();
    for record in records {
        *per_session.entry(record.session_id).or_default() += 1;
        per_student.entry(record.student_id).or_default().insert(
            record.session_id,
            SessionPresence {
                present: true,
                marked_at: record.marked_at,
                poll_code: record.poll_code,
            },
        );
    }

    let total_sessions = polled.len();
    let students = students
        .into_iter()
        .map(|member| {
            let attended = per_student.remove(&member.user_id).unwrap_or_default();
            let present_count = attended.keys().filter(|id| polled.contains(id)).count();
            StudentSummary {
                student_id: member.user_id,
                name: member.name,
                email: member.email,
                sessions: attended,
                total_sessions,
                present_count,
                attendance_percentage: attendance_percentage(present_count, total_sessions),
            }
        })
        .collect();

    let sessions = sessions
        .into_iter()
        .map(|session| SessionOverview {
            attendance_count: per_session.get(&session.id).copied().unwrap_or(0),
            has_poll: polled.contains(&session.id),
            id: session.id,
            name: session.name,
            date: session.date,
        })
        .collect();

    Ok(CourseSummary {
        course_id: class.id,
        sessions,
        students,
    })
}

/// Students as rows, sessions as columns, oldest session first.
pub async fn course_records(
    state: &AppState,
    principal: &Principal,
    class_id: Uuid,
) -> AppResult<CourseRecords> {
    let class = staff_class(state, principal, class_id).await?;

    let sessions = state.roster.sessions_of(class.id).await?;
    let students = state.roster.students_of(class.id).await?;

    let mut marks: HashMap<(Uuid, Uuid), MarkedAt> = state
        .store
        .class_records(class.id)
        .await?
        .into_iter()
        .map(|record| {
            (
                (record.student_id, record.session_id),
                MarkedAt {
                    marked_at: record.marked_at,
                },
            )
        })
        .collect();

    let students = students
        .into_iter()
        .map(|member| StudentRecordRow {
            session_attendance: sessions
                .iter()
                .map(|session| (session.id, marks.remove(&(member.user_id, session.id))))
                .collect(),
            student_id: member.user_id,
            name: member.name,
            email: member.email,
        })
        .collect();

    Ok(CourseRecords {
        course_id: class.id,
        sessions,
        students,
    })
}

fn ensure_self(principal: &Principal, student_id: Uuid) -> AppResult<()> {
    if principal.id == student_id {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "students may only view their own attendance",
        ))
    }
}

pub async fn student_history(
    state: &AppState,
    principal: &Principal,
    student_id: Uuid,
) -> AppResult<StudentHistory> {
    ensure_self(principal, student_id)?;

    let attendance = state.store.student_records(student_id).await?;

    Ok(StudentHistory {
        student_id,
        attendance,
    })
}

/// The student's history grouped by course, courses sorted by name.
pub async fn student_history_by_course(
    state: &AppState,
    principal: &Principal,
    student_id: Uuid,
) -> AppResult<Vec<CourseAttendanceGroup>> {
    ensure_self(principal, student_id)?;

    let mut groups: BTreeMap<(String, Uuid), CourseAttendanceGroup> = BTreeMap::new();
    for record in state.store.student_records(student_id).await? {
        groups
            .entry((record.course_name.clone(), record.course_id))
            .or_insert_with(|| CourseAttendanceGroup {
                course_id: record.course_id,
                course_name: record.course_name.clone(),
                attendances: Vec::new(),
            })
            .attendances
            .push(record);
    }

    Ok(groups.into_values().collect())
}

pub async fn student_course_attendance(
    state: &AppState,
    principal: &Principal,
    class_id: Uuid,
) -> AppResult<StudentCourseAttendance> {
    let class = state
        .roster
        .class(class_id)
        .await?
        .ok_or_else(|| AppError::not_found("course not found"))?;

    if !state.roster.is_student_of(principal.id, class.id).await? {
        return Err(AppError::forbidden("not enrolled in course"));
    }

    let sessions = state.roster.sessions_of(class.id).await?;
    let polled: HashSet<Uuid> = state
        .store
        .polled_sessions(class.id)
        .await?
        .into_iter()
        .collect();
    let present: HashSet<Uuid> = state
        .store
        .student_records(principal.id)
        .await?
        .into_iter()
        .filter(|record| record.course_id == class.id)
        .map(|record| record.session_id)
        .collect();

    let total_sessions = polled.len();
    let present_count = present.iter().filter(|id| polled.contains(id)).count();

    Ok(StudentCourseAttendance {
        course_id: class.id,
        sessions: sessions
            .into_iter()
            .map(|session| SessionWithPresence {
                is_present: present.contains(&session.id),
                id: session.id,
                name: session.name,
                date: session.date,
            })
            .collect(),
        attendance_percentage: attendance_percentage(present_count, total_sessions),
        total_sessions,
        present_count,
    })
}
