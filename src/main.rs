use nu_plugin::{serve_plugin, MsgPackSerializer};
use nu_plugin_sectors::SectorsPlugin;

fn main() {
    serve_plugin(&SectorsPlugin, MsgPackSerializer {})
}
