use super::{Identity, Task};

/// Renders one task row.
///
/// Each action is a POST target already bound to the task's id, so the row
/// needs nothing but the path. A row without an action offers no control for it.
#[derive(Debug)]
pub struct ItemView<'a> {
    task: &'a Task,
    on_toggle: Option<String>,
    on_delete: Option<String>,
}

impl<'a> ItemView<'a> {
    pub fn new(task: &'a Task) -> Self {
        Self {
            task,
            on_toggle: None,
            on_delete: None,
        }
    }

    pub fn on_toggle(mut self, action: impl Into<String>) -> Self {
        self.on_toggle = Some(action.into());
        self
    }

    pub fn on_delete(mut self, action: impl Into<String>) -> Self {
        self.on_delete = Some(action.into());
        self
    }

    pub fn render(&self) -> String {
        let mark = if self.task.completed { "[x]" } else { "[ ]" };
        let class = if self.task.completed {
            "todo-item completed"
        } else {
            "todo-item"
        };

        let check = match &self.on_toggle {
            Some(action) => format!(
                r#"<form method="post" action="{}"><button type="submit" class="toggle">{}</button></form>"#,
                escape_html(action),
                mark
            ),
            None => format!(r#"<span class="check">{}</span>"#, mark),
        };

        let delete = match &self.on_delete {
            Some(action) => format!(
                r#"<form method="post" action="{}"><button type="submit" class="delete">Delete</button></form>"#,
                escape_html(action)
            ),
            None => String::new(),
        };

        format!(
            r#"<li class="{}" id="todo-{}">{}<span class="text">{}</span>{}</li>"#,
            class,
            self.task.id,
            check,
            escape_html(&self.task.text),
            delete
        )
    }
}

pub fn toggle_action(task: &Task) -> String {
    format!("/todos/{}/toggle", task.id)
}

pub fn delete_action(task: &Task) -> String {
    format!("/todos/{}/delete", task.id)
}

/// Splits the list into (pending, completed), each oldest first.
pub fn partition(tasks: &[Task]) -> (Vec<&Task>, Vec<&Task>) {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by_key(|t| t.created_at);
    sorted.into_iter().partition(|t| !t.completed)
}

pub fn render_todo_page(identity: &Identity, input: &str, tasks: &[Task]) -> String {
    let (pending, completed) = partition(tasks);

    let pending_rows: String = pending
        .iter()
        .map(|t| ItemView::new(t).on_toggle(toggle_action(t)).render())
        .collect();
    let completed_rows: String = completed
        .iter()
        .map(|t| ItemView::new(t).on_delete(delete_action(t)).render())
        .collect();

    let body = format!(
        r#"<header><span class="user">{name}</span>
<form method="post" action="/signout"><button type="submit">Sign out</button></form></header>
<h1>Todo List</h1>
<form method="post" action="/todos" class="entry">
<input type="text" name="text" value="{input}" autofocus>
<button type="submit">Add Todo</button>
</form>
<section class="pending"><h2>Todo List</h2><ul>{pending_rows}</ul></section>
<section class="completed"><h2>Completed Todo</h2><ul>{completed_rows}</ul></section>"#,
        name = escape_html(&identity.display_name),
        input = escape_html(input),
        pending_rows = pending_rows,
        completed_rows = completed_rows,
    );

    layout("Todo List", &body)
}

pub fn render_signin_page(error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape_html(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Sign in</h1>{error}
<form method="post" action="/signin">
<input type="email" name="email" placeholder="Email">
<input type="password" name="password" placeholder="Password">
<button type="submit">Sign in</button>
</form>"#,
        error = error
    );

    layout("Sign in", &body)
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        escape_html(title),
        body
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
