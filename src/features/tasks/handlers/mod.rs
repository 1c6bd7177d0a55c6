pub mod task_handler;

pub use task_handler::{
    __path_add_task_assignees, __path_assign_tasks, __path_create_task, __path_delete_task,
    __path_get_task, __path_hard_delete_task, __path_list_tasks, __path_restore_task,
    __path_task_estimates, __path_update_task, add_task_assignees, assign_tasks, create_task,
    delete_task, get_task, hard_delete_task, list_tasks, restore_task, task_estimates,
    update_task,
};
