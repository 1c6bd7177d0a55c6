pub mod project_handler;

pub use project_handler::{
    __path_create_project, __path_delete_project, __path_edit_project, __path_get_project,
    __path_list_projects, create_project, delete_project, edit_project, get_project,
    list_projects,
};
