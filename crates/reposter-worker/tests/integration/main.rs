mod fakes;
mod poll_loop;
